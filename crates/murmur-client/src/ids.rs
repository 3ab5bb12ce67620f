use rand::Rng;
use rand::distr::Alphanumeric;

/// Length of generated message ids.
pub const MESSAGE_ID_LEN: usize = 20;

/// Random 20-character id over `[A-Za-z0-9]`.
///
/// 62^20 possible values makes collisions negligible, but nothing checks for
/// them: a colliding append overwrites the earlier message.
pub fn generate_message_id() -> String {
    generate_message_id_with(&mut rand::rng())
}

pub fn generate_message_id_with<R: Rng>(rng: &mut R) -> String {
    (0..MESSAGE_ID_LEN)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect()
}
