use actix_web::web::{ServiceConfig, scope};

use crate::modules::presence::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    cfg.service(scope("/presence").service(get_presence_batch).service(get_presence));
}
