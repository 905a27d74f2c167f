//! Per-entity bindings: document shapes, DTOs, schema pairs and indexes.
//!
//! Each entity implements [`Entity`](crate::repository::Entity); the
//! repository layer supplies the rest. The set here is representative, not
//! exhaustive — further entities follow the same pattern.

pub mod agencies;
pub mod files;
pub mod roles;
pub mod sessions;
pub mod stops;
pub mod users;

pub use agencies::{Agency, CreateAgencyDto, UpdateAgencyDto};
pub use files::{CreateFileDto, File, FileError, FilesRepository, UpdateFileDto};
pub use roles::{CreateRoleDto, Role, UpdateRoleDto};
pub use sessions::{CreateSessionDto, Session, UpdateSessionDto};
pub use stops::{CreateStopDto, Stop, UpdateStopDto};
pub use users::{CreateUserDto, UpdateUserDto, User, UsersRepository};
