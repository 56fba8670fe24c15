pub mod transaction;
pub mod user;

pub use transaction::{
    CreateTransaction, NewTransaction, Transaction, TransactionType, UpdateTransaction,
};
pub use user::{
    normalize_email, LoginRequest, NewUser, RegisterRequest, UpdateProfile, User, UserResponse,
};
