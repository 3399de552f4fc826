pub mod profile_middleware;
