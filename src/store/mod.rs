pub mod local;
pub mod remote;

pub use local::LocalStore;
pub use remote::RemoteStore;
