use std::convert::Infallible;

use rocket::request::{FromRequest, Outcome, Request};

/// Page window taken from `?page=`/`?len=` query parameters (short forms `p`
/// and `l` also accepted).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct PageState {
    pub page_length: u32,
    pub page: u32,
}

impl Default for PageState {
    fn default() -> Self {
        PageState {
            page_length: 20,
            page: 0,
        }
    }
}

impl PageState {
    pub fn skip(&self) -> u64 {
        self.page as u64 * self.page_length as u64
    }

    pub fn limit(&self) -> i64 {
        self.page_length as i64
    }
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for PageState {
    type Error = Infallible;

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        let length: Option<u32> = request
            .query_value("len")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("l").and_then(|it| it.ok()));

        let page: Option<u32> = request
            .query_value("page")
            .and_then(|it| it.ok())
            .or_else(|| request.query_value("p").and_then(|it| it.ok()));

        if let Some(p) = page {
            Outcome::Success(PageState {
                page_length: length.unwrap_or(20),
                page: p,
            })
        } else {
            Outcome::Success(Default::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_page_is_first_twenty() {
        let page = PageState::default();
        assert_eq!(page.skip(), 0);
        assert_eq!(page.limit(), 20);
    }

    #[test]
    fn skip_advances_by_whole_pages() {
        let page = PageState {
            page_length: 25,
            page: 3,
        };
        assert_eq!(page.skip(), 75);
        assert_eq!(page.limit(), 25);
    }
}
