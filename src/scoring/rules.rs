//! One-time rule bookkeeping
//!
//! Each user may use a breakfast ball (re-pick), a tap-in (swap to anyone
//! on the board) and a double-up (double points) once per season, and at
//! most one of them in any single event.

use serde::Serialize;
use std::fmt;
use std::str::FromStr;

use crate::error::PoolError;
use crate::state::User;

const NO_RULE: &str = "--";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Rule {
    BreakfastBall,
    TapIn,
    DoubleUp,
}

impl Rule {
    pub const ALL: [Rule; 3] = [Rule::BreakfastBall, Rule::TapIn, Rule::DoubleUp];

    /// Short label used in the weekly table
    pub fn label(self) -> &'static str {
        match self {
            Rule::BreakfastBall => "brekky ball",
            Rule::TapIn => "tap-in",
            Rule::DoubleUp => "double-up",
        }
    }

    /// Event the user spent this rule in
    pub fn marker(self, user: &User) -> Option<&str> {
        match self {
            Rule::BreakfastBall => user.strike_event.as_deref(),
            Rule::TapIn => user.substitute_event.as_deref(),
            Rule::DoubleUp => user.double_up_event.as_deref(),
        }
    }

    pub fn remaining(self, user: &User) -> u32 {
        match self {
            Rule::BreakfastBall => user.strikes_remaining,
            Rule::TapIn => user.substitutes_remaining,
            Rule::DoubleUp => user.double_ups_remaining,
        }
    }

    /// Record that the rule was spent in `event`
    pub fn consume(self, user: &mut User, event: &str) {
        let (marker, counter) = match self {
            Rule::BreakfastBall => (&mut user.strike_event, &mut user.strikes_remaining),
            Rule::TapIn => (&mut user.substitute_event, &mut user.substitutes_remaining),
            Rule::DoubleUp => (&mut user.double_up_event, &mut user.double_ups_remaining),
        };
        *marker = Some(event.to_string());
        *counter = counter.saturating_sub(1);
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Rule::BreakfastBall => "breakfast-ball",
            Rule::TapIn => "tap-in",
            Rule::DoubleUp => "double-up",
        };
        f.write_str(s)
    }
}

impl FromStr for Rule {
    type Err = PoolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast-ball" | "breakfast_ball" | "strike" => Ok(Rule::BreakfastBall),
            "tap-in" | "tap_in" | "substitute" => Ok(Rule::TapIn),
            "double-up" | "double_up" => Ok(Rule::DoubleUp),
            other => Err(PoolError::RuleUnavailable {
                rule: other.to_string(),
                message: "unknown rule".to_string(),
            }),
        }
    }
}

/// Which rules count as used for a user in the current event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
pub struct RuleStatus {
    pub strike_used: bool,
    pub tap_in_used: bool,
    pub double_up_used: bool,
}

impl RuleStatus {
    /// Without an event a rule counts as used once its marker is set. For
    /// an event, spending any rule there blocks all three for that event;
    /// whether a rule is left for later weeks is up to its counter.
    pub fn for_user(user: &User, current_event: Option<&str>) -> Self {
        let Some(event) = current_event else {
            return Self {
                strike_used: user.strike_event.is_some(),
                tap_in_used: user.substitute_event.is_some(),
                double_up_used: user.double_up_event.is_some(),
            };
        };

        let spent_here = Rule::ALL.iter().any(|rule| rule.marker(user) == Some(event));
        Self {
            strike_used: spent_here,
            tap_in_used: spent_here,
            double_up_used: spent_here,
        }
    }

    pub fn is_used(&self, rule: Rule) -> bool {
        match rule {
            Rule::BreakfastBall => self.strike_used,
            Rule::TapIn => self.tap_in_used,
            Rule::DoubleUp => self.double_up_used,
        }
    }
}

/// Rules a user can still invoke in the current event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RuleAvailability {
    pub breakfast_ball: bool,
    pub tap_in: bool,
    pub double_up: bool,
}

impl RuleAvailability {
    pub fn for_user(user: &User, current_event: Option<&str>) -> Self {
        let status = RuleStatus::for_user(user, current_event);
        let available = |rule: Rule| !status.is_used(rule) && rule.remaining(user) > 0;

        Self {
            breakfast_ball: available(Rule::BreakfastBall),
            tap_in: available(Rule::TapIn),
            double_up: available(Rule::DoubleUp),
        }
    }

    pub fn allows(&self, rule: Rule) -> bool {
        match rule {
            Rule::BreakfastBall => self.breakfast_ball,
            Rule::TapIn => self.tap_in,
            Rule::DoubleUp => self.double_up,
        }
    }
}

/// Label of the rule a user spent in `event`, or "--"
pub fn helper_label(user: &User, event: Option<&str>) -> &'static str {
    let Some(event) = event else {
        return NO_RULE;
    };
    Rule::ALL
        .iter()
        .find(|rule| rule.marker(user) == Some(event))
        .map(|rule| rule.label())
        .unwrap_or(NO_RULE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RuleAllowances;

    fn user() -> User {
        User::new(
            "a@b.c".to_string(),
            "scott".to_string(),
            "hash".to_string(),
            "2024",
            RuleAllowances::default(),
        )
    }

    #[test]
    fn test_fresh_user_has_everything() {
        let u = user();
        let status = RuleStatus::for_user(&u, Some("The Masters"));
        assert_eq!(status, RuleStatus::default());
        let available = RuleAvailability::for_user(&u, Some("The Masters"));
        assert!(available.breakfast_ball && available.tap_in && available.double_up);
        assert_eq!(helper_label(&u, Some("The Masters")), "--");
    }

    #[test]
    fn test_rule_used_this_event_blocks_the_others() {
        for rule in Rule::ALL {
            let mut u = user();
            rule.consume(&mut u, "The Masters");

            let status = RuleStatus::for_user(&u, Some("The Masters"));
            assert!(status.strike_used && status.tap_in_used && status.double_up_used);
            assert_eq!(helper_label(&u, Some("The Masters")), rule.label());

            // Next week only the spent rule is gone, because its counter is empty
            let next = RuleAvailability::for_user(&u, Some("RBC Heritage"));
            for other in Rule::ALL {
                assert_eq!(next.allows(other), other != rule);
            }
            assert_eq!(helper_label(&u, Some("RBC Heritage")), "--");
        }
    }

    #[test]
    fn test_second_allowance_usable_in_a_later_event() {
        let mut u = User::new(
            "a@b.c".to_string(),
            "scott".to_string(),
            "hash".to_string(),
            "2024",
            RuleAllowances {
                breakfast_balls: 1,
                tap_ins: 1,
                double_ups: 2,
            },
        );
        Rule::DoubleUp.consume(&mut u, "The Masters");
        assert_eq!(u.double_ups_remaining, 1);

        assert!(!RuleAvailability::for_user(&u, Some("The Masters")).allows(Rule::DoubleUp));
        let next = RuleAvailability::for_user(&u, Some("RBC Heritage"));
        assert!(next.allows(Rule::DoubleUp));

        Rule::DoubleUp.consume(&mut u, "RBC Heritage");
        let later = RuleAvailability::for_user(&u, Some("U.S. Open"));
        assert!(!later.allows(Rule::DoubleUp));
        assert!(later.allows(Rule::TapIn));
    }

    #[test]
    fn test_counter_gates_availability() {
        let mut u = user();
        u.double_ups_remaining = 0;
        let available = RuleAvailability::for_user(&u, Some("The Masters"));
        assert!(!available.allows(Rule::DoubleUp));
        assert!(available.allows(Rule::TapIn));

        Rule::TapIn.consume(&mut u, "The Masters");
        assert_eq!(u.substitutes_remaining, 0);
        assert_eq!(u.substitute_event.as_deref(), Some("The Masters"));
    }

    #[test]
    fn test_parse_rule_names() {
        assert_eq!("breakfast-ball".parse::<Rule>().unwrap(), Rule::BreakfastBall);
        assert_eq!("tap-in".parse::<Rule>().unwrap(), Rule::TapIn);
        assert_eq!("double-up".parse::<Rule>().unwrap(), Rule::DoubleUp);
        assert!("mulligan".parse::<Rule>().is_err());
        assert_eq!(Rule::BreakfastBall.to_string(), "breakfast-ball");
    }
}
