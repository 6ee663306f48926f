pub mod attendance;
pub mod employee;
pub mod leave_balance;
pub mod leave_request;
pub mod role;
pub mod settings;
pub mod tenant;
pub mod user;
