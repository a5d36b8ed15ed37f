//! Quiz authoring: the quiz the attempt checks run against and its questions

use serde_json::{json, Value};
use tracing::info;

use super::{contains_id, list_items};
use crate::fixtures::{Entity, Fixture, FixtureDelta, Fixtures, QuestionHandle, Role};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

/// A question whose right and wrong answers are known up front
struct Prompt {
    text: &'static str,
    options: &'static [&'static str],
    correct: &'static str,
    wrong: &'static str,
}

const PROMPTS: [Prompt; 2] = [
    Prompt {
        text: "What is 2 + 2?",
        options: &["3", "4", "5"],
        correct: "4",
        wrong: "5",
    },
    Prompt {
        text: "Which tool builds Rust packages?",
        options: &["npm", "cargo", "pip"],
        correct: "cargo",
        wrong: "npm",
    },
];

pub(super) fn create_quiz(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let course = f.entity(Entity::Course)?;
    let quiz = &h.config().quiz;

    let mut body = json!({
        "courseId": course,
        "title": "Test Quiz",
        "description": "Quiz created by the API test run",
        "passingScore": quiz.passing_score,
        "maxAttempts": quiz.max_attempts,
        "isPublished": true,
        "isRequired": true,
        "showCorrectAnswers": true,
        "shuffleQuestions": false,
        "shuffleOptions": false,
    });
    // Binding to the module makes module completion depend on this quiz
    if let (Ok(module), Some(map)) = (f.entity(Entity::Module), body.as_object_mut()) {
        map.insert("moduleId".to_string(), Value::from(module));
    }

    match f.token(Role::User) {
        Ok(user) => {
            h.expect(
                "Create Quiz - User (Non-Admin)",
                403,
                ApiRequest::post("quizzes").auth(user).json(body.clone()),
            )?;
        }
        Err(skipped) => h.skip("Create Quiz - User (Non-Admin)", &skipped),
    }

    let Some(resp) = h.expect(
        "Create Quiz - Admin",
        201,
        ApiRequest::post("quizzes").auth(admin).json(body),
    )?
    else {
        return Ok(FixtureDelta::none());
    };

    match resp.string_at("/quiz/id") {
        Some(id) => {
            info!("Created test quiz {}", id);
            Ok(Fixture::Entity(Entity::Quiz, id).into())
        }
        None => {
            h.require_fields("Create Quiz - Quiz Id", &resp, &["/quiz/id"]);
            Ok(FixtureDelta::none())
        }
    }
}

pub(super) fn add_questions(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let quiz = f.entity(Entity::Quiz)?;

    let mut delta = FixtureDelta::none();
    for (index, prompt) in PROMPTS.iter().enumerate() {
        let name = format!("Add Question {}", index + 1);
        let request = ApiRequest::post(format!("quizzes/{}/questions", quiz))
            .auth(admin)
            .json(json!({
                "questionText": prompt.text,
                "questionType": "multiple_choice",
                "options": prompt.options,
                "correctAnswer": prompt.correct,
                "explanation": format!("The answer is {}", prompt.correct),
                "orderIndex": index + 1,
            }));

        let Some(resp) = h.expect(&name, 201, request)? else {
            continue;
        };
        match resp.string_at("/question/id") {
            Some(id) => delta.push(Fixture::Question(QuestionHandle {
                id,
                correct_answer: prompt.correct.to_string(),
                wrong_answer: prompt.wrong.to_string(),
            })),
            None => {
                h.require_fields(&format!("{} - Question Id", name), &resp, &["/question/id"]);
            }
        }
    }

    Ok(delta)
}

pub(super) fn list_quizzes(h: &mut Harness, f: &Fixtures) -> StageResult {
    let course = f.entity(Entity::Course)?;

    if let Some(resp) = h.expect(
        "List Course Quizzes",
        200,
        ApiRequest::get(format!("quizzes/course/{}", course)),
    )? {
        match f.entity(Entity::Quiz) {
            Ok(quiz) => {
                let items = list_items(&resp.json().unwrap_or_default(), "quizzes");
                h.check("List Course Quizzes - Contains Quiz", contains_id(&items, quiz), || {
                    format!("quiz {} not in {} item(s)", quiz, items.len())
                });
            }
            Err(skipped) => h.skip("List Course Quizzes - Contains Quiz", &skipped),
        }
    }

    match f.entity(Entity::Module) {
        Ok(module) => {
            h.expect(
                "List Module Quizzes",
                200,
                ApiRequest::get(format!("quizzes/module/{}", module)),
            )?;
        }
        Err(skipped) => h.skip("List Module Quizzes", &skipped),
    }

    Ok(FixtureDelta::none())
}

pub(super) fn admin_read(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let quiz = f.entity(Entity::Quiz)?;

    if let Some(resp) = h.expect(
        "Get Quiz - Admin",
        200,
        ApiRequest::get(format!("quizzes/{}", quiz)).auth(admin),
    )? {
        let questions = questions_of(&resp.json().unwrap_or_default());
        match f.questions() {
            Ok(_) => {
                let exposed = questions.iter().filter(|q| has_answer(q)).count();
                h.check(
                    "Get Quiz - Admin Sees Answers",
                    !questions.is_empty() && exposed == questions.len(),
                    || {
                        format!(
                            "correctAnswer present on {} of {} question(s)",
                            exposed,
                            questions.len()
                        )
                    },
                );
            }
            Err(skipped) => h.skip("Get Quiz - Admin Sees Answers", &skipped),
        }
    }

    Ok(FixtureDelta::none())
}

pub(super) fn update_quiz(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let quiz = f.entity(Entity::Quiz)?;
    h.expect(
        "Update Quiz",
        200,
        ApiRequest::put(format!("quizzes/{}", quiz))
            .auth(admin)
            .json(json!({ "description": "Updated quiz description" })),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn update_question(h: &mut Harness, f: &Fixtures) -> StageResult {
    let admin = f.token(Role::Admin)?;
    let questions = f.questions()?;
    h.expect(
        "Update Question",
        200,
        ApiRequest::put(format!("quizzes/questions/{}", questions[0].id))
            .auth(admin)
            .json(json!({ "explanation": "Two plus two is four" })),
    )?;
    Ok(FixtureDelta::none())
}

/// The `questions` array of a quiz read
pub(super) fn questions_of(quiz: &Value) -> Vec<Value> {
    quiz.get("questions")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default()
}

pub(super) fn has_answer(question: &Value) -> bool {
    matches!(question.get("correctAnswer"), Some(v) if !v.is_null())
}
