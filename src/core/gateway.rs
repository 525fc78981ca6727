// Capability boundary for the remote post service.
use crate::core::error::Error;
use crate::core::post::Post;

/// Create/read/update/delete against the remote collection. Failures carry
/// `ErrorKind::Remote` with the service status when the service answered.
pub trait NetworkGateway {
    fn create(&self, title: &str, body: &str) -> Result<Post, Error>;
    fn read(&self, id: u64) -> Result<Post, Error>;
    fn update(&self, id: u64, title: &str, body: &str) -> Result<Post, Error>;
    fn delete(&self, id: u64) -> Result<(), Error>;
}

impl<T: NetworkGateway + ?Sized> NetworkGateway for Box<T> {
    fn create(&self, title: &str, body: &str) -> Result<Post, Error> {
        (**self).create(title, body)
    }

    fn read(&self, id: u64) -> Result<Post, Error> {
        (**self).read(id)
    }

    fn update(&self, id: u64, title: &str, body: &str) -> Result<Post, Error> {
        (**self).update(id, title, body)
    }

    fn delete(&self, id: u64) -> Result<(), Error> {
        (**self).delete(id)
    }
}

impl<T: NetworkGateway + ?Sized> NetworkGateway for &T {
    fn create(&self, title: &str, body: &str) -> Result<Post, Error> {
        (**self).create(title, body)
    }

    fn read(&self, id: u64) -> Result<Post, Error> {
        (**self).read(id)
    }

    fn update(&self, id: u64, title: &str, body: &str) -> Result<Post, Error> {
        (**self).update(id, title, body)
    }

    fn delete(&self, id: u64) -> Result<(), Error> {
        (**self).delete(id)
    }
}
