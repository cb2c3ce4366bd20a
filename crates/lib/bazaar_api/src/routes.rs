//! Route paths.

pub const GET_HEALTHZ: &str = "/healthz";
pub const POST_AUTH_REGISTER: &str = "/auth/register";
pub const POST_AUTH_LOGIN: &str = "/auth/login";
pub const POST_AUTH_REFRESH: &str = "/auth/refresh";
pub const POST_AUTH_LOGOUT: &str = "/auth/logout";
/// `GET` and `PUT`.
pub const USERS_ME: &str = "/users/me";
pub const PATCH_USERS_ME_PASSWORD: &str = "/users/me/password";
