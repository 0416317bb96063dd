//! Next-task selection and block completion.

use chrono::{Local, NaiveDate};
use clap::Args;
use frontier_core::opportunity::{ExternalFeedback, Sentiment};
use frontier_core::{BlockOutcome, NextTaskRequest, OpportunityContext};

use super::{CliResult, Context};

#[derive(Args)]
pub struct NextArgs {
    /// Current energy, 1 to 5
    #[arg(long, default_value_t = 3)]
    pub energy: u8,
    /// Time available, e.g. "45 minutes" or "1 hour"
    #[arg(long, default_value = "30 minutes")]
    pub time: String,
    /// Where you are working, e.g. "commute"
    #[arg(long)]
    pub context: Option<String>,
}

pub fn next(args: NextArgs, ctx: &Context) -> CliResult {
    let orch = ctx.orchestrator()?;
    let session = ctx.session(orch.config());
    let request = NextTaskRequest {
        context: args.context,
        energy: args.energy,
        time_available: args.time,
    };
    ctx.print(&orch.get_next_task(&session, &request)?)
}

#[derive(Args)]
pub struct CompleteArgs {
    /// Block id from the day's schedule
    pub block_id: String,
    /// Schedule date (YYYY-MM-DD), defaults to today
    #[arg(long)]
    pub date: Option<NaiveDate>,
    /// What happened
    #[arg(long)]
    pub outcome: Option<String>,
    /// What was learned
    #[arg(long)]
    pub learned: Option<String>,
    /// Questions raised for next time
    #[arg(long)]
    pub questions: Option<String>,
    /// Energy after the block, 1 to 5
    #[arg(long)]
    pub energy_after: Option<u8>,
    /// Perceived difficulty, 1 to 5
    #[arg(long)]
    pub difficulty: Option<u8>,
    #[arg(long)]
    pub breakthrough: bool,
    /// Minutes actually spent
    #[arg(long)]
    pub minutes: Option<u32>,
    /// Engagement, 1 to 10
    #[arg(long)]
    pub engagement: Option<u8>,
    /// The result looks shareable
    #[arg(long)]
    pub viral: bool,
    /// Unexpected result (repeatable)
    #[arg(long)]
    pub unexpected: Vec<String>,
    /// Positive outside feedback as "source: content" (repeatable)
    #[arg(long)]
    pub praise: Vec<String>,
    /// Outside feedback as "source:sentiment:content", sentiment being
    /// positive, negative or neutral (repeatable)
    #[arg(long, value_parser = parse_feedback)]
    pub feedback: Vec<ExternalFeedback>,
    /// Social reaction, e.g. "40 shares" (repeatable)
    #[arg(long)]
    pub reaction: Vec<String>,
    /// Skill the work revealed (repeatable)
    #[arg(long)]
    pub skill: Vec<String>,
    /// Industry contact made (repeatable)
    #[arg(long)]
    pub connection: Vec<String>,
    /// Serendipitous event (repeatable)
    #[arg(long)]
    pub serendipity: Vec<String>,
}

impl CompleteArgs {
    fn opportunity(&self) -> Option<OpportunityContext> {
        let mut context = OpportunityContext {
            viral_potential: self.viral,
            unexpected_results: self.unexpected.clone(),
            external_feedback: self
                .praise
                .iter()
                .map(|p| praise(p))
                .chain(self.feedback.iter().cloned())
                .collect(),
            social_reactions: self.reaction.clone(),
            new_skills_revealed: self.skill.clone(),
            industry_connections: self.connection.clone(),
            serendipitous_events: self.serendipity.clone(),
            ..Default::default()
        };
        if let Some(level) = self.engagement {
            context.engagement_level = level;
        }
        context.into_meaningful()
    }

    fn into_outcome(self) -> BlockOutcome {
        let opportunity = self.opportunity();
        BlockOutcome {
            outcome: self.outcome,
            learned: self.learned,
            next_questions: self.questions,
            energy_after: self.energy_after,
            difficulty_rating: self.difficulty,
            breakthrough: self.breakthrough,
            actual_minutes: self.minutes,
            opportunity,
        }
    }
}

fn praise(text: &str) -> ExternalFeedback {
    let (source, content) = match text.split_once(':') {
        Some((source, content)) => (source.trim(), content.trim()),
        None => ("someone", text.trim()),
    };
    ExternalFeedback {
        source: source.to_string(),
        content: content.to_string(),
        sentiment: Sentiment::Positive,
    }
}

fn parse_feedback(text: &str) -> Result<ExternalFeedback, String> {
    let mut parts = text.splitn(3, ':');
    let (Some(source), Some(sentiment), Some(content)) = (parts.next(), parts.next(), parts.next()) else {
        return Err(format!("expected source:sentiment:content, got '{text}'"));
    };
    Ok(ExternalFeedback {
        source: source.trim().to_string(),
        content: content.trim().to_string(),
        sentiment: sentiment.parse::<Sentiment>()?,
    })
}

pub fn complete(args: CompleteArgs, ctx: &Context) -> CliResult {
    let orch = ctx.orchestrator()?;
    let session = ctx.session(orch.config());
    let date = args.date.unwrap_or_else(|| Local::now().date_naive());
    let block_id = args.block_id.clone();
    let outcome = args.into_outcome();
    ctx.print(&orch.complete_block(&session, date, &block_id, &outcome)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> CompleteArgs {
        CompleteArgs {
            block_id: "learning-1".into(),
            date: None,
            outcome: None,
            learned: None,
            questions: None,
            energy_after: None,
            difficulty: None,
            breakthrough: false,
            minutes: None,
            engagement: None,
            viral: false,
            unexpected: Vec::new(),
            praise: Vec::new(),
            feedback: Vec::new(),
            reaction: Vec::new(),
            skill: Vec::new(),
            connection: Vec::new(),
            serendipity: Vec::new(),
        }
    }

    #[test]
    fn no_signals_means_no_opportunity() {
        assert!(args().into_outcome().opportunity.is_none());
    }

    #[test]
    fn praise_is_split_on_colon() {
        let feedback = praise("mentor: great voicings");
        assert_eq!(feedback.source, "mentor");
        assert_eq!(feedback.content, "great voicings");
        assert_eq!(praise("nice").source, "someone");
    }

    #[test]
    fn engagement_makes_context_meaningful() {
        let outcome = CompleteArgs {
            engagement: Some(9),
            ..args()
        }
        .into_outcome();
        assert_eq!(outcome.opportunity.map(|o| o.engagement_level), Some(9));
    }

    #[test]
    fn feedback_carries_sentiment() {
        let feedback = parse_feedback("editor: negative : too long").unwrap();
        assert_eq!(feedback.source, "editor");
        assert_eq!(feedback.sentiment, Sentiment::Negative);
        assert_eq!(feedback.content, "too long");
        assert!(parse_feedback("editor:meh").is_err());
        assert!(parse_feedback("editor:grumpy:text").is_err());
    }

    #[test]
    fn every_signal_reaches_the_context() {
        let outcome = CompleteArgs {
            feedback: vec![parse_feedback("mentor:neutral:ok").unwrap()],
            reaction: vec!["40 shares".into()],
            skill: vec!["ear training".into()],
            connection: vec!["local band".into()],
            serendipity: vec!["met a teacher".into()],
            ..args()
        }
        .into_outcome();
        let context = outcome.opportunity.unwrap();
        assert_eq!(context.external_feedback[0].sentiment, Sentiment::Neutral);
        assert_eq!(context.social_reactions, vec!["40 shares"]);
        assert_eq!(context.new_skills_revealed, vec!["ear training"]);
        assert_eq!(context.industry_connections, vec!["local band"]);
        assert_eq!(context.serendipitous_events, vec!["met a teacher"]);
    }
}
