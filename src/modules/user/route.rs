use actix_web::web::{ServiceConfig, scope};

use crate::modules::user::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(
        scope("/users").service(get_own_profile).service(search_directory).service(get_profile),
    );
}
