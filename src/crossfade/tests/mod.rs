
mod session_tests;
