use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod db;

use crate::resp::fail::{self, ApiError};

pub static HOMEWORK_COLLECTION_NAME: &str = "homework";

/// Multiple-choice question; `answer` indexes into `options`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub text: String,
    pub options: Vec<String>,
    pub answer: u8,
}

impl Question {
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.options.len() < 2 {
            return Err(fail::validation(
                "A question needs at least two answer options.",
            ));
        }
        if self.answer as usize >= self.options.len() {
            return Err(fail::validation(format!(
                "Answer index {} is out of range for {} options.",
                self.answer,
                self.options.len()
            )));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Homework {
    #[serde(
        default = "Uuid::new_v4",
        rename = "_id",
        with = "bson::serde_helpers::uuid_1_as_binary"
    )]
    pub id: Uuid,
    pub organization: Uuid,
    pub class: Uuid,
    pub subject: Uuid,
    pub title: String,
    #[serde(default)]
    pub questions: Vec<Question>,
    #[serde(default = "Utc::now", with = "bson::serde_helpers::chrono_datetime_as_bson_datetime")]
    pub created: DateTime<Utc>,
}

impl Homework {
    pub fn new(
        organization: Uuid,
        class: Uuid,
        subject: Uuid,
        title: impl ToString,
        questions: Vec<Question>,
    ) -> Result<Homework, ApiError> {
        for question in &questions {
            question.validate()?;
        }

        Ok(Homework {
            id: Uuid::new_v4(),
            organization,
            class,
            subject,
            title: title.to_string(),
            questions,
            created: Utc::now(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn question(options: usize, answer: u8) -> Question {
        Question {
            text: "pick one".to_string(),
            options: (0..options).map(|i| format!("option {}", i)).collect(),
            answer,
        }
    }

    #[test]
    fn answer_must_index_an_option() {
        assert!(question(4, 3).validate().is_ok());
        assert!(question(4, 4).validate().is_err());
    }

    #[test]
    fn single_option_question_is_rejected() {
        assert!(question(1, 0).validate().is_err());
    }

    #[test]
    fn homework_rejects_bad_questions() {
        let org = Uuid::new_v4();
        let result = Homework::new(
            org,
            Uuid::new_v4(),
            Uuid::new_v4(),
            "Algebra drill",
            vec![question(3, 1), question(2, 5)],
        );
        assert!(result.is_err());
    }
}
