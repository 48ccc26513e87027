use std::fmt::{self, Display};

use crate::state::ResearchState;

/// The printable summary of a research run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ResearchReport {
    /// The final answer.
    pub results: String,
    /// The research steps, in order.
    pub research_steps: Vec<String>,
    /// The sources consulted.
    pub sources: Vec<String>,
}

impl ResearchReport {
    /// Collects the report out of a finished run.
    pub fn from_state(state: &ResearchState) -> Self {
        Self {
            results: state.final_answer().to_owned(),
            research_steps: state.research_steps().to_vec(),
            sources: state.sources().to_vec(),
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[String]) -> fmt::Result {
    for (idx, item) in items.iter().enumerate() {
        if idx > 0 {
            f.write_str("\n")?;
        }
        write!(f, "- {item}")?;
    }
    Ok(())
}

impl Display for ResearchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "\nRESEARCH REPORT\n--------------\n\nRESULTS:\n{}\n\nRESEARCH STEPS:\n",
            self.results
        )?;
        write_list(f, &self.research_steps)?;
        f.write_str("\n\nSOURCES:\n")?;
        write_list(f, &self.sources)?;
        f.write_str("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let report = ResearchReport {
            results: "Rust is a systems language.".to_owned(),
            research_steps: vec![
                "Searched for: rust".to_owned(),
                "Searched for: rust history".to_owned(),
            ],
            sources: vec!["Web search results".to_owned()],
        };
        assert_eq!(
            report.to_string(),
            "\nRESEARCH REPORT\n--------------\n\n\
             RESULTS:\nRust is a systems language.\n\n\
             RESEARCH STEPS:\n- Searched for: rust\n- Searched for: rust history\n\n\
             SOURCES:\n- Web search results\n"
        );
    }

    #[test]
    fn test_empty_state() {
        let report = ResearchReport::from_state(&ResearchState::default());
        assert_eq!(report.results, "No results");
        assert_eq!(
            report.to_string(),
            "\nRESEARCH REPORT\n--------------\n\nRESULTS:\nNo results\n\n\
             RESEARCH STEPS:\n\n\nSOURCES:\n\n"
        );
    }
}
