pub struct Env {
    pub jwt_secret: String,
    pub database_url: String,
    pub redis_url: String,
    pub frontend_url: String,
    pub ip: String,
    pub port: u16,
}

impl Env {
    fn new() -> Self {
        let jwt_secret = std::env::var("SECRET_KEY")
            .expect("SECRET_KEY must be set in .env file or environment variable");

        let database_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set in .env file or environment variable");
        let redis_url = std::env::var("REDIS_URL")
            .expect("REDIS_URL must be set in .env file or environment variable");

        let frontend_url =
            std::env::var("FRONTEND_URL").unwrap_or_else(|_| "http://localhost:5173".to_string());
        let ip = std::env::var("IP").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = std::env::var("PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .expect("PORT must be a valid u16 integer");

        Env { jwt_secret, database_url, redis_url, frontend_url, ip, port }
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}
