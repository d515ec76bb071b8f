/// Per-tier limits
///
/// Each provider tier has its own output-token ceiling and request timeout.
/// Requested budgets are clamped to the tier ceiling, and timeouts are kept
/// inside a 30 to 60 second window so the worst-case cascade stays bounded.
///
/// | Tier | Max tokens | Timeout |
/// |---|---|---|
/// | Gemini Flash | 2500 | 45 s |
/// | Gemini Paid | 3000 | 55 s |
/// | Groq | 2000 | 35 s |

use std::time::Duration;

/// Shortest allowed provider timeout
pub const MIN_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest allowed provider timeout
pub const MAX_TIMEOUT: Duration = Duration::from_secs(60);

/// Responses larger than this are discarded as failures
pub const MAX_RESPONSE_BYTES: usize = 512 * 1024;

/// Token limit and timeout of one tier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TierLimits {
    pub max_tokens: u32,
    pub timeout: Duration,
}

pub const GEMINI_FLASH: TierLimits = TierLimits {
    max_tokens: 2500,
    timeout: Duration::from_secs(45),
};

pub const GEMINI_PAID: TierLimits = TierLimits {
    max_tokens: 3000,
    timeout: Duration::from_secs(55),
};

pub const GROQ: TierLimits = TierLimits {
    max_tokens: 2000,
    timeout: Duration::from_secs(35),
};

impl TierLimits {
    /// Builds limits with the timeout clamped into the allowed window
    pub fn new(max_tokens: u32, timeout: Duration) -> Self {
        TierLimits {
            max_tokens: max_tokens.max(1),
            timeout: timeout.clamp(MIN_TIMEOUT, MAX_TIMEOUT),
        }
    }

    /// Budget actually sent to the tier. `None` means "as much as the tier allows".
    pub fn clamp_tokens(&self, requested: Option<u32>) -> u32 {
        match requested {
            Some(0) => 1,
            Some(tokens) => tokens.min(self.max_tokens),
            None => self.max_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_tokens() {
        assert_eq!(GROQ.clamp_tokens(Some(1500)), 1500);
        assert_eq!(GROQ.clamp_tokens(Some(4000)), 2000);
        assert_eq!(GROQ.clamp_tokens(None), 2000);
        assert_eq!(GROQ.clamp_tokens(Some(0)), 1);
    }

    #[test]
    fn test_timeout_window() {
        assert_eq!(TierLimits::new(100, Duration::from_secs(5)).timeout, MIN_TIMEOUT);
        assert_eq!(TierLimits::new(100, Duration::from_secs(600)).timeout, MAX_TIMEOUT);
        assert_eq!(TierLimits::new(100, Duration::from_secs(40)).timeout, Duration::from_secs(40));
    }

    #[test]
    fn test_builtin_tiers_inside_window() {
        for tier in [GEMINI_FLASH, GEMINI_PAID, GROQ] {
            assert!(tier.timeout >= MIN_TIMEOUT && tier.timeout <= MAX_TIMEOUT);
        }
    }
}
