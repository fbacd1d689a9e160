use crate::rules::Rule;
use std::collections::VecDeque;
use std::fmt;

/// Ordered rules still to run on a plan.
///
/// Rules are taken from the front. A running rule may push rules to the front, including
/// itself, so that they run next.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuleStack {
    rules: VecDeque<Rule>,
}

impl RuleStack {
    pub fn new() -> Self {
        Self {
            rules: VecDeque::new(),
        }
    }

    /// Schedules `rule` to run before every rule already on the stack.
    pub fn add_first(&mut self, rule: Rule) {
        self.rules.push_front(rule);
    }

    /// Schedules `rule` to run after every rule already on the stack.
    pub fn add_last(&mut self, rule: Rule) {
        self.rules.push_back(rule);
    }

    /// Removes and returns the next rule to run.
    pub fn pop(&mut self) -> Option<Rule> {
        self.rules.pop_front()
    }

    /// Returns the next rule to run without removing it.
    pub fn peek(&self) -> Option<Rule> {
        self.rules.front().copied()
    }

    pub fn contains(&self, rule: Rule) -> bool {
        self.rules.contains(&rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Iterates over the rules in the order they will run.
    pub fn iter(&self) -> impl Iterator<Item = &Rule> {
        self.rules.iter()
    }
}

impl fmt::Display for RuleStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.rules.iter().map(|r| r.name()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_order() {
        let mut stack = RuleStack::new();
        assert!(stack.is_empty());
        stack.add_last(Rule::PushSelectCriteria);
        stack.add_last(Rule::PushProjects);
        stack.add_first(Rule::ReplaceViews);
        assert_eq!(stack.len(), 3);
        assert_eq!(stack.peek(), Some(Rule::ReplaceViews));
        assert!(stack.contains(Rule::PushProjects));
        assert!(!stack.contains(Rule::CopyCriteria));
        assert_eq!(
            stack.to_string(),
            "[ReplaceViews, PushSelectCriteria, PushProjects]"
        );
        assert_eq!(stack.pop(), Some(Rule::ReplaceViews));
        assert_eq!(stack.pop(), Some(Rule::PushSelectCriteria));
        assert_eq!(stack.pop(), Some(Rule::PushProjects));
        assert_eq!(stack.pop(), None);
    }
}
