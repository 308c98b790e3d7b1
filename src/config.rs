pub mod http {
    use tokio::time::{Duration};

    pub const TIMEOUT: Duration = Duration::from_secs(10);
    pub const DEFAULT_BASE_URL: &str = "http://localhost:8080/api/v1";
    pub const LOGIN_PATH: &str = "/users/login";
    pub const PROFILE_PATH: &str = "/users/profile";
}

pub mod pagination {
    pub const FIRST_PAGE: u32 = 1;
    pub const DEFAULT_PAGE_SIZE: u32 = 10;
    pub const MAX_PAGE_SIZE: u32 = 100;
}

pub mod storage {
    pub const DEFAULT_TOKEN_PATH: &str = ".mes_token.json";
}
