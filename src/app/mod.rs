pub mod check;
pub mod desktop;
pub mod session;
