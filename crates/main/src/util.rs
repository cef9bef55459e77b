use rand::{distributions::Alphanumeric, Rng};
use uuid::Uuid;

pub fn short_random(n: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(n)
        .map(char::from)
        .collect()
}

/// Public ids are time-ordered so that rows created together sort together.
pub fn gen_uuid() -> Uuid {
    Uuid::now_v7()
}

#[cfg(test)]
mod tests {
    use super::short_random;

    #[test]
    fn short_random_has_requested_length() {
        let code = short_random(32);
        assert_eq!(code.len(), 32);
        assert!(code.chars().all(|c| c.is_ascii_alphanumeric()));
    }
}
