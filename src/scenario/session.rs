// HTTP session standing in for a browser: keeps cookies and the current page

use crate::errors::{HarnessError, Result};
use crate::scenario::page::Page;
use reqwest::blocking::{Client, Response};
use reqwest::Url;
use std::time::Duration;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub struct Session {
    base: Url,
    http: Client,
    page: Option<Page>,
}

impl Session {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: &str, timeout: Duration) -> Result<Self> {
        let base = Url::parse(base_url)
            .map_err(|e| HarnessError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        let http = Client::builder()
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            base,
            http,
            page: None,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// The page loaded last
    pub fn page(&self) -> Result<&Page> {
        self.page
            .as_ref()
            .ok_or_else(|| HarnessError::ElementNotFound("no page loaded".to_string()))
    }

    /// Load `path` relative to the base URL
    pub fn open(&mut self, path: &str) -> Result<&Page> {
        let url = join(&self.base, path)?;
        tracing::debug!(%url, "GET");
        let response = self.http.get(url).send()?;
        self.load(response)
    }

    /// Fill the current page's form with `fields` and submit it
    pub fn submit_form(&mut self, fields: &[(String, String)]) -> Result<&Page> {
        let page = self.page()?;
        let action = page
            .form_action()
            .ok_or_else(|| HarnessError::ElementNotFound(format!("form on {}", page.url)))?;
        if let Some((missing, _)) = fields.iter().find(|(name, _)| !page.has_field(name)) {
            return Err(HarnessError::ElementNotFound(format!(
                "field '{}' on {}",
                missing, page.url
            )));
        }

        let target = join(&page.url, &action)?;
        let request = if page.form_method() == "post" {
            self.http.post(target.clone()).form(fields)
        } else {
            self.http.get(target.clone()).query(fields)
        };

        tracing::debug!(url = %target, fields = fields.len(), "Submitting form");
        let response = request.send()?;
        self.load(response)
    }

    /// Follow the `nth` (1-based) link whose text contains `text`
    pub fn follow_link(&mut self, text: &str, nth: usize) -> Result<&Page> {
        let page = self.page()?;
        let href = nth
            .checked_sub(1)
            .and_then(|idx| page.links(text).into_iter().nth(idx))
            .ok_or_else(|| {
                HarnessError::ElementNotFound(format!("link '{}' #{} on {}", text, nth, page.url))
            })?;

        let url = join(&page.url, &href)?;
        tracing::debug!(%url, "Following link");
        let response = self.http.get(url).send()?;
        self.load(response)
    }

    fn load(&mut self, response: Response) -> Result<&Page> {
        let url = response.url().clone();
        let status = response.status().as_u16();
        let body = response.text()?;

        Ok(&*self.page.insert(Page::new(url, status, body)))
    }
}

fn join(base: &Url, href: &str) -> Result<Url> {
    base.join(href)
        .map_err(|e| HarnessError::InvalidUrl(format!("{}: {}", href, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_base() {
        assert!(matches!(
            Session::new("not a url"),
            Err(HarnessError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_no_page_before_open() {
        let mut session = Session::new("http://localhost:8080/").unwrap();
        assert!(matches!(session.page(), Err(HarnessError::ElementNotFound(_))));
        assert!(matches!(
            session.follow_link("Edit", 1),
            Err(HarnessError::ElementNotFound(_))
        ));
        assert!(matches!(
            session.submit_form(&[]),
            Err(HarnessError::ElementNotFound(_))
        ));
    }

    #[test]
    fn test_join_relative() {
        let base = Url::parse("http://localhost:8080/articles/").unwrap();
        assert_eq!(
            join(&base, "/edit/article_0").unwrap().as_str(),
            "http://localhost:8080/edit/article_0"
        );
        assert_eq!(
            join(&base, "").unwrap().as_str(),
            "http://localhost:8080/articles/"
        );
    }
}
