//! The `analytics` step: video statistics, engagement and comment analysis.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use insights_tasks::{StepError, StepInput, StepKind, StepProcessor};
use serde_json::{json, Map, Value};
use tracing::warn;

use super::{percent, round2, upstream};
use crate::services::sentiment::{self, CommentCategory, SentimentLabel};
use crate::services::youtube::{extract_video_id, Comment, VideoDetails, VideoSource};

const TOP_KEYWORDS: usize = 10;
const SAMPLE_COMMENTS: usize = 5;

/// Fetches a video's details and comments and scores them.
///
/// Reads the optional `max_comments` parameter to override the configured
/// comment limit.
pub struct AnalyticsAgent {
    videos: Arc<dyn VideoSource>,
    max_comments: usize,
}

impl AnalyticsAgent {
    pub fn new(videos: Arc<dyn VideoSource>, max_comments: usize) -> Self {
        Self {
            videos,
            max_comments,
        }
    }
}

#[async_trait]
impl StepProcessor for AnalyticsAgent {
    fn kind(&self) -> StepKind {
        StepKind::Analytics
    }

    fn parameter_keys(&self) -> Option<&'static [&'static str]> {
        Some(&["max_comments"])
    }

    async fn process(&self, input: StepInput<'_>) -> Result<Value, StepError> {
        let video_id = extract_video_id(input.target).ok_or_else(|| {
            StepError::InvalidInput(format!(
                "'{}' is not a YouTube video id or URL",
                input.target
            ))
        })?;
        let max_comments = input
            .parameters
            .get("max_comments")
            .and_then(Value::as_u64)
            .map_or(self.max_comments, |n| n as usize);

        let details = self
            .videos
            .video_details(&video_id)
            .await
            .map_err(|e| upstream("youtube", e))?;

        // Comments may be disabled; that is not a reason to fail the step.
        let comments = match self.videos.comments(&video_id, max_comments).await {
            Ok(comments) => comments,
            Err(err) => {
                warn!(
                    task_id = input.task_id,
                    video_id = %video_id,
                    category = err.category(),
                    error = %err,
                    "comment fetch failed, continuing without comments"
                );
                Vec::new()
            },
        };

        Ok(build_report(&details, &comments))
    }
}

/// Assembles the analytics payload from fetched data.
pub fn build_report(details: &VideoDetails, comments: &[Comment]) -> Value {
    let engagement = json!({
        "engagement_rate": percent(details.like_count + details.comment_count, details.view_count),
        "like_ratio": percent(details.like_count, details.view_count),
        "comment_ratio": percent(details.comment_count, details.view_count),
    });
    let comment_analysis = analyze_comments(comments);
    let summary = summarize(details, &engagement, &comment_analysis);

    json!({
        "video_id": details.video_id,
        "video_analytics": details,
        "engagement": engagement,
        "comment_analysis": comment_analysis,
        "summary": summary,
    })
}

struct Scored<'a> {
    comment: &'a Comment,
    label: SentimentLabel,
    category: CommentCategory,
    sarcastic: bool,
}

fn analyze_comments(comments: &[Comment]) -> Value {
    let mut positive = 0u64;
    let mut negative = 0u64;
    let mut neutral = 0u64;
    let mut questions = 0u64;
    let mut sarcastic = 0u64;
    let mut total_likes = 0u64;
    let mut total_replies = 0u64;
    let mut compound_sum = 0.0;
    let mut categories: HashMap<CommentCategory, u64> = HashMap::new();
    let mut labelled: Vec<Scored<'_>> = Vec::with_capacity(comments.len());

    for comment in comments {
        let score = sentiment::compound_score(&comment.text);
        let label = SentimentLabel::from_compound(score);
        match label {
            SentimentLabel::Positive => positive += 1,
            SentimentLabel::Negative => negative += 1,
            SentimentLabel::Neutral => neutral += 1,
        }
        if sentiment::is_question(&comment.text) {
            questions += 1;
        }
        let category = sentiment::categorize(&comment.text);
        *categories.entry(category).or_insert(0) += 1;
        let is_sarcastic = sentiment::is_sarcastic(&comment.text);
        if is_sarcastic {
            sarcastic += 1;
        }
        total_likes += comment.like_count;
        total_replies += comment.reply_count;
        compound_sum += score;
        labelled.push(Scored {
            comment,
            label,
            category,
            sarcastic: is_sarcastic,
        });
    }

    let total = comments.len() as u64;
    let average = if total == 0 {
        0.0
    } else {
        round2(compound_sum / total as f64)
    };

    let keywords: Vec<Value> =
        sentiment::keyword_frequencies(comments.iter().map(|c| c.text.as_str()), TOP_KEYWORDS)
            .into_iter()
            .map(|(word, count)| json!({ "word": word, "count": count }))
            .collect();

    let category_counts: Map<String, Value> = CommentCategory::ALL
        .iter()
        .map(|c| (c.as_str().to_string(), json!(categories.get(c).copied().unwrap_or(0))))
        .collect();
    let avg_likes = if total == 0 {
        0.0
    } else {
        round2(total_likes as f64 / total as f64)
    };

    labelled.sort_by(|a, b| b.comment.like_count.cmp(&a.comment.like_count));
    let samples: Vec<Value> = labelled
        .iter()
        .take(SAMPLE_COMMENTS)
        .map(|scored| {
            json!({
                "author": scored.comment.author,
                "text": scored.comment.text,
                "likes": scored.comment.like_count,
                "replies": scored.comment.reply_count,
                "sentiment": scored.label.as_str(),
                "category": scored.category.as_str(),
                "sarcastic": scored.sarcastic,
            })
        })
        .collect();

    json!({
        "total_comments": total,
        "question_count": questions,
        "average_sentiment": average,
        "sentiment_breakdown": {
            "positive": positive,
            "negative": negative,
            "neutral": neutral,
        },
        "sentiment_percentages": {
            "positive": percent(positive, total),
            "negative": percent(negative, total),
            "neutral": percent(neutral, total),
        },
        "categories": category_counts,
        "sarcasm": {
            "sarcastic_count": sarcastic,
            "sarcastic_percentage": percent(sarcastic, total),
        },
        "engagement_metrics": {
            "total_likes": total_likes,
            "total_replies": total_replies,
            "avg_likes_per_comment": avg_likes,
        },
        "top_keywords": keywords,
        "sample_comments": samples,
    })
}

fn summarize(details: &VideoDetails, engagement: &Value, comments: &Value) -> String {
    let mut summary = format!(
        "\"{}\" by {} has {} views, {} likes and {} comments (engagement rate {}%).",
        details.title,
        details.channel,
        details.view_count,
        details.like_count,
        details.comment_count,
        engagement["engagement_rate"],
    );
    let analysed = comments["total_comments"].as_u64().unwrap_or(0);
    if analysed > 0 {
        summary.push_str(&format!(
            " Of {analysed} analysed comments, {}% are positive and {}% negative.",
            comments["sentiment_percentages"]["positive"],
            comments["sentiment_percentages"]["negative"],
        ));
    } else {
        summary.push_str(" No comments were available for analysis.");
    }
    summary
}
