//! Repository abstractions for data access.
//!
//! Repositories provide a clean interface for database operations,
//! hiding the `SeaORM` implementation details from the rest of the
//! application. Every write that touches a payable's settlement fields runs
//! inside a transaction holding a row lock on the payable.

pub mod client;
pub mod payable;
pub mod payment;


pub use client::{ClientError, ClientRepository, CreateClientInput, UpdateClientInput};
pub use payable::{
    CreatePayableInput, PayableError, PayableFilter, PayableRepository, PayableWithOwner,
    UpdatePayableInput,
};
pub use payment::{CreatePaymentInput, PaymentError, PaymentRepository};
