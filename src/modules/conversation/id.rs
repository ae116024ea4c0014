use uuid::Uuid;

/// Separator between the two participant ids in a conversation id.
pub const CONVERSATION_ID_SEPARATOR: char = '_';

/// Derives the conversation id for an unordered pair of users: the two
/// ids sorted, then joined. Commutative, so both participants resolve
/// the same thread no matter who opens it first.
pub fn resolve_conversation_id(user_id_a: &Uuid, user_id_b: &Uuid) -> String {
    let (first, second) =
        if user_id_a <= user_id_b { (user_id_a, user_id_b) } else { (user_id_b, user_id_a) };

    format!("{first}{CONVERSATION_ID_SEPARATOR}{second}")
}
