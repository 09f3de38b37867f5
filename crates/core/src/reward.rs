//! Block reward schedule.

/// Base the reward is computed from; one unit of difficulty costs 10.
const REWARD_CEILING: i64 = 64;

/// Amount a FEE transaction may mint for a block mined at `difficulty`.
///
/// Not clamped: past difficulty 64 the result is zero or negative.
pub fn reward_amount(difficulty: u32) -> i64 {
    (REWARD_CEILING - i64::from(difficulty)) * 10
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reward_decreases_with_difficulty() {
        assert_eq!(reward_amount(0), 640);
        assert_eq!(reward_amount(1), 630);
        assert_eq!(reward_amount(2), 620);
        assert_eq!(reward_amount(62), 20);
    }

    #[test]
    fn test_reward_is_unclamped() {
        assert_eq!(reward_amount(64), 0);
        assert_eq!(reward_amount(70), -60);
    }
}
