//! Rolegate - role and permission based access control
//!
//! Subjects of the host application hold roles and direct permissions,
//! each scoped by an authentication guard. Links live in a relational
//! store through SeaORM; a per-tenant read-through cache holds the global
//! permission snapshot used by the gate hook.

pub mod authz;
pub mod cache;
pub mod entities;
pub mod errors;
pub mod guard;
pub mod settings;
pub mod storage;
pub mod subject;

pub use authz::Authorizer;
pub use errors::RolegateError;
pub use subject::{Subject, SubjectRef};
