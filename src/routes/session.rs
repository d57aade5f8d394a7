use axum_extra::extract::CookieJar;
use axum_extra::extract::cookie::{Cookie, SameSite};
use nanoid::nanoid;

use crate::services::visits::VisitService;

pub const SESSION_COOKIE: &str = "sessionid";

const SESSION_ID_LENGTH: usize = 32;

/// Ids we hand out are 32 characters of the nanoid alphabet.
fn is_well_formed(id: &str) -> bool {
    id.len() == SESSION_ID_LENGTH
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'_' || b == b'-')
}

/// The session id carried by the request, if it looks like one of ours.
fn cookie_session_id(jar: &CookieJar) -> Option<String> {
    jar.get(SESSION_COOKIE)
        .map(|c| c.value().to_string())
        .filter(|id| is_well_formed(id))
}

fn issue_session(jar: CookieJar) -> (CookieJar, String) {
    let id = nanoid!(SESSION_ID_LENGTH);
    let cookie = Cookie::build((SESSION_COOKIE, id.clone()))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax);
    (jar.add(cookie), id)
}

/// Returns the visitor's session id. A missing, malformed, expired or unknown
/// id is replaced by a fresh one and a new session cookie.
pub async fn current_session(jar: CookieJar, visits: &VisitService) -> (CookieJar, String) {
    if let Some(id) = cookie_session_id(&jar) {
        if visits.has_session(&id).await {
            return (jar, id);
        }
        tracing::debug!("Replacing unknown session id");
    }
    issue_session(jar)
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;
    use crate::store::SessionRepository;

    const KNOWN_ID: &str = "V1StGXR8_Z5jdHi6B-myTabcdefghijk";

    async fn visits_with_known_session() -> VisitService {
        let sessions = SessionRepository::in_memory();
        let mut values = HashMap::new();
        values.insert("visits".to_string(), "1".to_string());
        sessions.save(KNOWN_ID, &values).await.unwrap();
        VisitService::new(sessions)
    }

    #[test]
    fn only_issued_shapes_are_well_formed() {
        assert!(is_well_formed(KNOWN_ID));
        assert!(is_well_formed(&nanoid!(SESSION_ID_LENGTH)));
        assert!(!is_well_formed("abc"));
        assert!(!is_well_formed(&"a".repeat(100_000)));
        assert!(!is_well_formed("V1StGXR8_Z5jdHi6B-myTabcdefghij!"));
    }

    #[tokio::test]
    async fn known_session_is_kept() {
        let visits = visits_with_known_session().await;
        let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, KNOWN_ID));
        let (_, id) = current_session(jar, &visits).await;
        assert_eq!(id, KNOWN_ID);
    }

    #[tokio::test]
    async fn missing_session_gets_a_cookie() {
        let visits = visits_with_known_session().await;
        let (jar, id) = current_session(CookieJar::new(), &visits).await;
        assert_eq!(id.len(), SESSION_ID_LENGTH);
        assert_eq!(jar.get(SESSION_COOKIE).map(|c| c.value()), Some(id.as_str()));
    }

    #[tokio::test]
    async fn client_chosen_ids_are_replaced() {
        let visits = visits_with_known_session().await;
        let unknown = "a".repeat(SESSION_ID_LENGTH);
        let huge = "x".repeat(100_000);
        for bogus in ["short", unknown.as_str(), huge.as_str()] {
            let jar = CookieJar::new().add(Cookie::new(SESSION_COOKIE, bogus.to_string()));
            let (jar, id) = current_session(jar, &visits).await;
            assert_ne!(id, bogus);
            assert!(is_well_formed(&id));
            assert_eq!(jar.get(SESSION_COOKIE).map(|c| c.value()), Some(id.as_str()));
        }
    }
}
