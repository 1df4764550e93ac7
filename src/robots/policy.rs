//! Parsed robots.txt rules, checked with the robotstxt crate

use robotstxt::DefaultMatcher;
use std::time::Duration;

/// Robots rules for the catalog origin
#[derive(Debug, Clone)]
pub struct RobotsPolicy {
    /// Raw robots.txt content; `None` allows everything
    content: Option<String>,
}

impl RobotsPolicy {
    /// Creates a policy from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: Some(content.to_string()),
        }
    }

    /// Creates a permissive policy
    pub fn allow_all() -> Self {
        Self { content: None }
    }

    /// Checks whether `url` may be fetched by `user_agent`
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        match self.content.as_deref() {
            None | Some("") => true,
            Some(content) => {
                let mut matcher = DefaultMatcher::default();
                matcher.one_agent_allowed_by_robots(content, user_agent, url)
            }
        }
    }

    /// Crawl delay requested for `user_agent`, if any
    ///
    /// A group naming the agent wins over the `*` group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<Duration> {
        let content = self.content.as_deref()?;
        let agent = user_agent.to_lowercase();

        let mut group: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    if !in_agent_lines {
                        group.clear();
                    }
                    in_agent_lines = true;
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_agent_lines = false;
                    let Ok(seconds) = value.parse::<f64>() else {
                        continue;
                    };
                    if !seconds.is_finite() || seconds < 0.0 {
                        continue;
                    }
                    let delay = Duration::from_secs_f64(seconds);
                    if group.iter().any(|ua| ua != "*" && agent.contains(ua.as_str())) {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_agent_lines = false,
            }
        }

        specific.or(wildcard)
    }
}
