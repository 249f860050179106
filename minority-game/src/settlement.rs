use crate::{Amount, GameError, Result};
use chrono::{DateTime, Utc};
use minority_seal::{Choice, DecryptedChoice};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RefundReason {
    /// Both sides have the same number of players.
    Tie,
    /// Everybody picked the same side, so there is no minority.
    Unanimous,
    NoPlayers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Minority(Choice),
    Refund(RefundReason),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameResult {
    pub total_a: usize,
    pub total_b: usize,
    pub outcome: Outcome,
    pub winners: Vec<String>,
    pub pool: Amount,
    pub prize_per_winner: Amount,
    /// Part of the pool that does not divide evenly between winners.
    pub remainder: Amount,
    pub revealed_at: DateTime<Utc>,
}

impl GameResult {
    pub fn winner_choice(&self) -> Option<Choice> {
        match self.outcome {
            Outcome::Minority(choice) => Some(choice),
            Outcome::Refund(_) => None,
        }
    }

    pub fn is_refund(&self) -> bool {
        matches!(self.outcome, Outcome::Refund(_))
    }
}

/// Side with strictly fewer players, if it is non-empty.
pub fn minority(total_a: usize, total_b: usize) -> Outcome {
    match (total_a, total_b) {
        (0, 0) => Outcome::Refund(RefundReason::NoPlayers),
        (0, _) | (_, 0) => Outcome::Refund(RefundReason::Unanimous),
        (a, b) if a == b => Outcome::Refund(RefundReason::Tie),
        (a, b) if a < b => Outcome::Minority(Choice::A),
        _ => Outcome::Minority(Choice::B),
    }
}

/// Settle a room: the minority side splits the whole pool evenly.
pub fn settle(bet_amount: Amount, revealed: &[DecryptedChoice]) -> Result<GameResult> {
    let total_a = revealed.iter().filter(|r| r.choice == Choice::A).count();
    let total_b = revealed.len() - total_a;

    let pool = bet_amount
        .checked_mul(revealed.len() as u64)
        .ok_or_else(|| GameError::InvalidBetAmount("Prize pool overflows".to_string()))?;

    let outcome = minority(total_a, total_b);

    let (winners, prize_per_winner, remainder) = match outcome {
        Outcome::Minority(choice) => {
            let winners: Vec<String> = revealed
                .iter()
                .filter(|r| r.choice == choice)
                .map(|r| r.player.clone())
                .collect();
            let (share, remainder) = pool
                .split(winners.len() as u64)
                .ok_or_else(|| GameError::Internal("Minority side has no players".to_string()))?;
            (winners, share, remainder)
        }
        Outcome::Refund(reason) => {
            tracing::warn!("No minority ({:?}), refunding {} players", reason, revealed.len());
            (Vec::new(), Amount::ZERO, Amount::ZERO)
        }
    };

    Ok(GameResult {
        total_a,
        total_b,
        outcome,
        winners,
        pool,
        prize_per_winner,
        remainder,
        revealed_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn picks(choices: &[Choice]) -> Vec<DecryptedChoice> {
        choices
            .iter()
            .enumerate()
            .map(|(i, c)| DecryptedChoice {
                player: format!("0x{:x}", i + 1),
                choice: *c,
            })
            .collect()
    }

    #[test]
    fn test_five_four_split() {
        use Choice::{A, B};
        let revealed = picks(&[A, B, A, B, A, B, A, B, A]);
        let bet: Amount = "0.1".parse().unwrap();

        let result = settle(bet, &revealed).unwrap();

        assert_eq!(result.total_a, 5);
        assert_eq!(result.total_b, 4);
        assert_eq!(result.winner_choice(), Some(B));
        assert_eq!(result.winners, vec!["0x2", "0x4", "0x6", "0x8"]);
        assert_eq!(result.pool, "0.9".parse::<Amount>().unwrap());
        assert_eq!(result.prize_per_winner, "0.225".parse::<Amount>().unwrap());
        assert_eq!(result.remainder, Amount::ZERO);
    }

    #[test]
    fn test_remainder_is_reported() {
        use Choice::{A, B};
        let revealed = picks(&[A, A, A, A, B, B, B]);
        let result = settle(Amount::from_mist(10), &revealed).unwrap();

        assert_eq!(result.winner_choice(), Some(B));
        assert_eq!(result.pool, Amount::from_mist(70));
        assert_eq!(result.prize_per_winner, Amount::from_mist(23));
        assert_eq!(result.remainder, Amount::from_mist(1));
    }

    #[test]
    fn test_refund_cases() {
        use Choice::{A, B};
        assert_eq!(minority(0, 0), Outcome::Refund(RefundReason::NoPlayers));
        assert_eq!(minority(9, 0), Outcome::Refund(RefundReason::Unanimous));
        assert_eq!(minority(4, 4), Outcome::Refund(RefundReason::Tie));
        assert_eq!(minority(1, 8), Outcome::Minority(A));

        let result = settle(Amount::from_mist(5), &picks(&[A, B])).unwrap();
        assert!(result.is_refund());
        assert!(result.winners.is_empty());
        assert_eq!(result.prize_per_winner, Amount::ZERO);
    }

    #[test]
    fn test_pool_overflow() {
        let revealed = picks(&[Choice::A, Choice::B, Choice::B]);
        assert!(settle(Amount::from_mist(u64::MAX), &revealed).is_err());
    }
}
