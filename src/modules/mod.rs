pub mod user {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod friend {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
    pub mod route;
}

pub mod conversation {
    pub mod id;
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
    pub mod route;
}

// Message endpoints are mounted under the conversation scope, so the
// message module carries no route file of its own.
pub mod message {
    pub mod schema;
    pub mod model;
    pub mod repository;
    pub mod repository_pg;
    pub mod handle;
    pub mod service;
}

pub mod presence {
    pub mod handle;
    pub mod route;
    pub mod tracker;
}

pub mod realtime;
