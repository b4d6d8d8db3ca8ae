pub mod middleware;
pub mod password;
