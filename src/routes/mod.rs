/// Router Module Index
///
/// Organizes the application's routing logic into one module per resource,
/// mirroring the API surface (`/api/v1/auth`, `/api/v1/posts`, `/api/v1/tags`).
///
/// Access control is not applied at the router level: the admin-only handlers
/// declare the `AdminUser` guard in their signatures, so a route's protection is
/// visible exactly where the handler is defined.

/// The login flow.
pub mod auth;

/// Post reads (anonymous) and post mutations (admin-guarded).
pub mod posts;

/// Tag listing.
pub mod tags;
