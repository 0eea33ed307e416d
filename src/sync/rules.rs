use regex::{Regex, RegexBuilder};

use crate::config::{RuleSpec, RulesConfig};
use crate::error::TaskboardError;
use crate::models::{Category, Priority};

/// One `pattern → value` classification rule.
#[derive(Debug, Clone)]
pub struct Rule<T> {
    pattern: Regex,
    value: T,
}

/// Ordered rules evaluated top to bottom; the first match wins, otherwise the fallback.
#[derive(Debug, Clone)]
pub struct RuleTable<T> {
    rules: Vec<Rule<T>>,
    fallback: T,
}

impl<T: Copy> RuleTable<T> {
    pub fn new(fallback: T) -> Self {
        Self {
            rules: Vec::new(),
            fallback,
        }
    }

    /// Append a case-insensitive rule.
    pub fn rule(mut self, pattern: &str, value: T) -> Result<Self, regex::Error> {
        self.rules.push(Rule {
            pattern: RegexBuilder::new(pattern).case_insensitive(true).build()?,
            value,
        });
        Ok(self)
    }

    /// Put user-supplied rules ahead of the built-in ones.
    pub fn with_overrides(
        mut self,
        specs: &[RuleSpec],
        parse: impl Fn(&str) -> Option<T>,
        table: &str,
    ) -> Result<Self, TaskboardError> {
        let mut extra = Vec::with_capacity(specs.len());
        for spec in specs {
            let value = parse(&spec.value).ok_or_else(|| {
                TaskboardError::config(format!(
                    "rules.{table}: unknown value '{}' for pattern '{}'",
                    spec.value, spec.pattern
                ))
            })?;
            let pattern = RegexBuilder::new(&spec.pattern)
                .case_insensitive(true)
                .build()
                .map_err(|e| TaskboardError::config(format!("rules.{table}: {e}")))?;
            extra.push(Rule { pattern, value });
        }
        extra.append(&mut self.rules);
        self.rules = extra;
        Ok(self)
    }

    pub fn classify(&self, text: &str) -> T {
        self.rules
            .iter()
            .find(|r| r.pattern.is_match(text))
            .map(|r| r.value)
            .unwrap_or(self.fallback)
    }
}

/// The classification tables used by the importers.
#[derive(Debug, Clone)]
pub struct Classifier {
    pub priority: RuleTable<Priority>,
    pub category: RuleTable<Category>,
    pub cron_priority: RuleTable<Priority>,
    pub cron_category: RuleTable<Category>,
}

impl Classifier {
    pub fn builtin() -> Result<Self, regex::Error> {
        Ok(Self {
            priority: RuleTable::new(Priority::Medium)
                .rule(r"urgent|critical|asap|emergency", Priority::Urgent)?
                .rule(r"high|important|priority", Priority::High)?
                .rule(r"low|minor|someday", Priority::Low)?,
            category: RuleTable::new(Category::Project)
                .rule(r"cron|automat|script|bot|heartbeat", Category::Automation)?
                .rule(
                    r"email|message|slack|discord|telegram|notify",
                    Category::Communication,
                )?
                .rule(r"fix|bug|maintain|update|upgrade|patch", Category::Maintenance)?,
            cron_priority: RuleTable::new(Priority::Medium)
                .rule(r"urgent|important|critical|medicine|brief", Priority::High)?,
            cron_category: RuleTable::new(Category::Automation)
                .rule(r"medicine|gym", Category::Communication)?
                .rule(r"nptel|quiz", Category::Project)?,
        })
    }

    pub fn from_config(rules: &RulesConfig) -> Result<Self, TaskboardError> {
        let builtin = Self::builtin().map_err(|e| TaskboardError::config(e.to_string()))?;
        Ok(Self {
            priority: builtin
                .priority
                .with_overrides(&rules.priority, Priority::from_str, "priority")?,
            category: builtin
                .category
                .with_overrides(&rules.category, Category::from_str, "category")?,
            cron_priority: builtin.cron_priority.with_overrides(
                &rules.cron_priority,
                Priority::from_str,
                "cron_priority",
            )?,
            cron_category: builtin.cron_category.with_overrides(
                &rules.cron_category,
                Category::from_str,
                "cron_category",
            )?,
        })
    }
}
