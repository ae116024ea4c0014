use actix_web::web::{ServiceConfig, scope};

use crate::modules::friend::handle::*;

pub fn configure(cfg: &mut ServiceConfig) {
    // Literal /requests paths must register before the {friend_id}
    // captures.
    cfg.service(
        scope("/friends")
            .service(get_requests)
            .service(send_request)
            .service(accept_request)
            .service(reject_request)
            .service(cancel_request)
            .service(get_friendship_status)
            .service(remove_friend)
            .service(get_friends),
    );
}
