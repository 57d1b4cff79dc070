//! Fixtures shared by unit tests

#![allow(clippy::unwrap_used, clippy::expect_used)]

use chrono::{DateTime, NaiveDate, Utc};
use medtrain_common::types::{
    new_id, DeviceType, Grant, Permissions, Question, QuestionType, Role, TestResult, Training,
    User,
};

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn user(name: &str, role: Role) -> User {
    User {
        id: new_id(),
        username: name.to_string(),
        password_hash: String::new(),
        role,
        permissions: Permissions::default(),
    }
}

pub fn trainee(name: &str) -> User {
    user(name, Role::Trainee)
}

pub fn admin(name: &str) -> User {
    user(name, Role::Admin)
}

pub fn grant(training: &Training, from: NaiveDate, until: NaiveDate, devices: &[&str]) -> Grant {
    Grant::new(
        training.id.clone(),
        from,
        until,
        devices.iter().map(|d| d.to_string()),
    )
}

/// Question `i` of a fixture device.
///
/// Even indices are single choice with answer `{1}`, odd indices are
/// multiple choice with answers `{0, 2}`. Options are always `A, B, C`.
pub fn question(i: usize) -> Question {
    let options = vec!["A".to_string(), "B".to_string(), "C".to_string()];
    if i % 2 == 0 {
        Question::new(format!("Question {i}"), QuestionType::Single, options, [1]).unwrap()
    } else {
        Question::new(format!("Question {i}"), QuestionType::Multiple, options, [0, 2]).unwrap()
    }
}

pub fn device(training_id: &str, title: &str, questions: usize, passing: u32) -> DeviceType {
    DeviceType {
        id: new_id(),
        training_id: training_id.to_string(),
        title: title.to_string(),
        description: format!("{title} description"),
        image_url: String::new(),
        image_scale: 100,
        passing_percentage: passing,
        questions: (0..questions).map(question).collect(),
        documentation: None,
    }
}

pub fn training_with_device(title: &str, device_title: &str, questions: usize, passing: u32) -> Training {
    let id = new_id();
    Training {
        device_types: vec![device(&id, device_title, questions, passing)],
        id,
        title: title.to_string(),
        description: format!("{title} description"),
        image_url: String::new(),
        image_scale: 100,
    }
}

pub fn result(user_id: &str, device_id: &str, timestamp: DateTime<Utc>, locked: bool) -> TestResult {
    TestResult {
        id: new_id(),
        user_id: user_id.to_string(),
        username: "fixture".to_string(),
        device_id: device_id.to_string(),
        device_title: "Fixture device".to_string(),
        score: 100.0,
        passed: true,
        timestamp,
        is_locked: locked,
    }
}
