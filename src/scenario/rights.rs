// Login and access-rights checks for the MDMS web app

use crate::scenario::Scenario;

pub const ACCESS_RIGHTS: &str = "access-rights";
pub const WRONG_CREDENTIALS: &str = "Wrong login and/or password";
pub const SUBMIT_BUTTON: &str = "btn btn-success";

pub fn access_denied_message(resource: &str) -> String {
    format!("You are not allowed to access {} resource", resource)
}

/// Two failed logins, then a protected edit page must refuse access
pub fn access_rights() -> Scenario {
    Scenario::new(ACCESS_RIGHTS)
        .visit("/")
        .submit(&[("login", "admin"), ("password", "admi")])
        .expect_text(WRONG_CREDENTIALS)
        .expect_button(SUBMIT_BUTTON)
        .submit(&[("login", "admi"), ("password", "admin")])
        .expect_text(WRONG_CREDENTIALS)
        .expect_button(SUBMIT_BUTTON)
        .follow_link("Edit", 3)
        .expect_text(&access_denied_message("/edit/article_0"))
}
