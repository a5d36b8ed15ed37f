//! Quiz attempt workflow
//!
//! Attempt lifecycle is `NotStarted -> InProgress -> Submitted`. The graded
//! attempt answers the first question correctly and every other one wrong,
//! so the expected score is known before the server reports it.

use serde_json::{json, Map, Value};
use tracing::{info, warn};

use super::quizzes::{has_answer, questions_of};
use super::{contains_id, list_items};
use crate::assertions::EXCERPT_LEN;
use crate::error::ProbeResult;
use crate::fixtures::{
    AttemptState, AuthToken, Entity, Fixture, FixtureDelta, Fixtures, QuestionHandle, Role,
    Skipped, Submission,
};
use crate::pipeline::{Harness, StageResult};
use crate::scoring::{within_tolerance, AnswerTally, ScoringModel};
use crate::session::ApiRequest;

/// Server message that marks the attempt limit
const MAX_ATTEMPTS_MARKER: &str = "Maximum attempts";

pub(super) fn start(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let quiz = f.entity(Entity::Quiz)?;

    // 200 means the server resumed an in-progress attempt
    let Some(resp) = h.expect_in(
        "Start Quiz Attempt",
        &[200, 201],
        ApiRequest::post(format!("quizzes/{}/start", quiz)).auth(user),
    )?
    else {
        return Ok(FixtureDelta::none());
    };

    match resp.string_at("/attempt/id") {
        Some(id) => {
            info!("Quiz attempt {} in progress", id);
            Ok(Fixture::Entity(Entity::Attempt, id).into())
        }
        None => {
            h.require_fields("Start Quiz Attempt - Attempt Id", &resp, &["/attempt/id"]);
            Ok(FixtureDelta::none())
        }
    }
}

pub(super) fn fetch_questions(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let quiz = f.entity(Entity::Quiz)?;

    if let Some(resp) = h.expect(
        "Fetch Quiz Questions",
        200,
        ApiRequest::get(format!("quizzes/{}", quiz)).auth(user),
    )? {
        let questions = questions_of(&resp.json().unwrap_or_default());
        match f.questions() {
            Ok(created) => {
                let expected = created.len().max(2);
                h.check("Fetch Quiz Questions - Count", questions.len() >= expected, || {
                    format!("expected at least {} question(s), got {}", expected, questions.len())
                });
            }
            Err(skipped) => h.skip("Fetch Quiz Questions - Count", &skipped),
        }

        let leaked = questions.iter().filter(|q| has_answer(q)).count();
        h.check("Fetch Quiz Questions - Answers Withheld", leaked == 0, || {
            format!("correctAnswer exposed on {} question(s)", leaked)
        });
    }

    Ok(FixtureDelta::none())
}

pub(super) fn submit(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let quiz = f.entity(Entity::Quiz)?;
    let attempt = f.entity(Entity::Attempt)?;
    let questions = f.questions()?;

    let (answers, tally) = graded_answers(questions);
    let Some(resp) = h.expect(
        "Submit Quiz",
        200,
        ApiRequest::post(format!("quizzes/{}/submit", quiz))
            .auth(user)
            .json(json!({
                "attemptId": attempt,
                "answers": answers,
                "timeSpentSeconds": 60,
            })),
    )?
    else {
        return Ok(FixtureDelta::none());
    };

    let Some(score) = resp.number_at("/score") else {
        h.recorder_mut().fail(
            "Submit Quiz - Score",
            "score not found in response",
            Some(resp.excerpt(EXCERPT_LEN)),
        );
        return Ok(FixtureDelta::none());
    };
    let passed = resp.pointer("/passed").and_then(|v| v.as_bool());
    info!("Quiz submitted, score {} (passed: {:?})", score, passed);

    Ok(Fixture::Submission(Submission {
        attempt_id: attempt.to_string(),
        score,
        passed,
        tally,
    })
    .into())
}

pub(super) fn verify_score(h: &mut Harness, f: &Fixtures) -> StageResult {
    let submission = f.submission()?;
    let model = ScoringModel::from_config(&h.config().quiz);
    let tolerance = h.config().expectations.score_tolerance;
    let expected = model.expected_percentage(submission.tally);

    h.check(
        "Quiz Score Calculation",
        within_tolerance(submission.score, expected, tolerance),
        || {
            format!(
                "reported {}, expected {} (tolerance {})",
                submission.score, expected, tolerance
            )
        },
    );
    Ok(FixtureDelta::none())
}

pub(super) fn history(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let quiz = f.entity(Entity::Quiz)?;
    let submission = f.submission()?;

    if let Some(resp) = h.expect(
        "List Quiz Attempts",
        200,
        ApiRequest::get(format!("quizzes/{}/attempts", quiz)).auth(user),
    )? {
        let items = list_items(&resp.json().unwrap_or_default(), "attempts");
        h.check(
            "List Quiz Attempts - Contains Attempt",
            contains_id(&items, &submission.attempt_id),
            || format!("attempt {} not in {} item(s)", submission.attempt_id, items.len()),
        );
    }

    h.expect(
        "Get Quiz Attempt",
        200,
        ApiRequest::get(format!("quizzes/attempts/{}", submission.attempt_id)).auth(user),
    )?;

    Ok(FixtureDelta::none())
}

pub(super) fn resubmit(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let quiz = f.entity(Entity::Quiz)?;
    let submission = f.submission()?;
    let questions = f.questions()?;

    let (answers, _) = graded_answers(questions);
    h.expect(
        "Resubmit Quiz - Already Submitted",
        400,
        ApiRequest::post(format!("quizzes/{}/submit", quiz))
            .auth(user)
            .json(json!({
                "attemptId": submission.attempt_id,
                "answers": answers,
                "timeSpentSeconds": 60,
            })),
    )?;
    Ok(FixtureDelta::none())
}

/// Start attempts until the server refuses with "Maximum attempts".
///
/// Every attempt the server opens here is submitted blank, so the only
/// graded verdict stays the one from [`submit`].
pub(super) fn attempt_limit(h: &mut Harness, f: &Fixtures) -> StageResult {
    let user = f.token(Role::User)?;
    let quiz = f.entity(Entity::Quiz)?;
    if f.attempt_state() != AttemptState::Submitted {
        return Err(Skipped::missing("submitted quiz attempt").into());
    }

    let max_attempts = h.config().quiz.max_attempts;
    let mut opened: u32 = 0;

    // One start was already spent; the limit must hit within max_attempts more
    for round in 0..max_attempts {
        let outcome = h.send(ApiRequest::post(format!("quizzes/{}/start", quiz)).auth(user))?;
        let resp = match outcome {
            Ok(resp) => resp,
            Err(e) => {
                h.recorder_mut()
                    .fail("Quiz Attempt Limit", format!("exception - {}", e), None);
                return Ok(FixtureDelta::none());
            }
        };

        match resp.status {
            200 | 201 => {
                if round == 0 {
                    h.recorder_mut()
                        .pass("Restart After Submit", &format!("Status: {}", resp.status));
                }
                let Some(attempt) = resp.string_at("/attempt/id") else {
                    h.recorder_mut().fail(
                        "Quiz Attempt Limit",
                        "attempt id missing from start response",
                        Some(resp.excerpt(EXCERPT_LEN)),
                    );
                    return Ok(FixtureDelta::none());
                };
                opened += 1;
                close_attempt(h, quiz, &attempt, user)?;
            }
            400 if resp.body.contains(MAX_ATTEMPTS_MARKER) => {
                if round == 0 {
                    h.recorder_mut()
                        .pass("Restart After Submit", "Status: 400 (limit reached)");
                }
                let total = opened + 1;
                h.recorder_mut()
                    .pass("Quiz Attempt Limit", &format!("refused after {} attempt(s)", total));
                h.check("Quiz Attempt Limit - Count", total == max_attempts, || {
                    format!("refused after {} attempt(s), maxAttempts is {}", total, max_attempts)
                });
                return Ok(FixtureDelta::none());
            }
            status => {
                h.recorder_mut().fail(
                    "Quiz Attempt Limit",
                    format!(
                        "expected 200, 201 or 400 \"{}\", got {}",
                        MAX_ATTEMPTS_MARKER, status
                    ),
                    Some(resp.excerpt(EXCERPT_LEN)),
                );
                return Ok(FixtureDelta::none());
            }
        }
    }

    h.recorder_mut().fail(
        "Quiz Attempt Limit",
        format!(
            "server accepted {} start(s) with maxAttempts = {}",
            opened + 1,
            max_attempts
        ),
        None,
    );
    Ok(FixtureDelta::none())
}

fn close_attempt(
    h: &mut Harness,
    quiz: &str,
    attempt: &str,
    user: &AuthToken,
) -> ProbeResult<()> {
    let request = ApiRequest::post(format!("quizzes/{}/submit", quiz))
        .auth(user)
        .json(json!({ "attemptId": attempt, "answers": {}, "timeSpentSeconds": 1 }));
    match h.send(request)? {
        Ok(resp) if resp.status == 200 => {}
        Ok(resp) => warn!("Could not close attempt {}: status {}", attempt, resp.status),
        Err(e) => warn!("Could not close attempt {}: {}", attempt, e),
    }
    Ok(())
}

/// First question right, the rest wrong
fn graded_answers(questions: &[QuestionHandle]) -> (Value, AnswerTally) {
    let mut answers = Map::new();
    for (index, question) in questions.iter().enumerate() {
        let answer = if index == 0 {
            &question.correct_answer
        } else {
            &question.wrong_answer
        };
        answers.insert(question.id.clone(), Value::from(answer.as_str()));
    }
    let correct = u32::from(!questions.is_empty());
    let incorrect = u32::try_from(questions.len()).unwrap_or(u32::MAX) - correct;
    (Value::Object(answers), AnswerTally::new(correct, incorrect, 0))
}
