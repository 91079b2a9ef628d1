use chrono::{Duration, Utc};

use foyer_gate::domain::types::{Role, Template, VerificationPurpose};
use foyer_gate::error::GateError;
use foyer_gate::usecase::password_reset::{
    RequestPasswordResetInput, RequestPasswordResetUseCase, VerifyPasswordResetInput,
    VerifyPasswordResetUseCase,
};

use crate::helpers::{
    MockAccountGateway, MockCodeRepo, MockLoginEventRepo, MockNotifier, MockRateLimiter,
    stored_code, test_account,
};

fn request_usecase(
    codes: MockCodeRepo,
    accounts: MockAccountGateway,
    notifier: MockNotifier,
) -> RequestPasswordResetUseCase<MockCodeRepo, MockRateLimiter, MockAccountGateway, MockNotifier> {
    RequestPasswordResetUseCase {
        codes,
        rate_limiter: MockRateLimiter::permissive(),
        accounts,
        notifier,
    }
}

fn verify_usecase(
    codes: MockCodeRepo,
    accounts: MockAccountGateway,
    login_events: MockLoginEventRepo,
) -> VerifyPasswordResetUseCase<MockCodeRepo, MockRateLimiter, MockAccountGateway, MockLoginEventRepo>
{
    VerifyPasswordResetUseCase {
        codes,
        rate_limiter: MockRateLimiter::permissive(),
        accounts,
        login_events,
    }
}

#[tokio::test]
async fn should_stay_silent_for_unknown_email() {
    let codes = MockCodeRepo::empty();
    let notifier = MockNotifier::working();
    let uc = request_usecase(codes.clone(), MockAccountGateway::empty(), notifier.clone());

    uc.execute(RequestPasswordResetInput {
        email: "nobody@example.com".to_owned(),
        ip: "203.0.113.9".to_owned(),
    })
    .await
    .unwrap();

    assert!(codes.codes.lock().unwrap().is_empty());
    assert!(notifier.sent.lock().unwrap().is_empty());
}

#[tokio::test]
async fn should_store_reset_code_tied_to_the_account() {
    let account = test_account("grace@example.com", Role::Member);
    let codes = MockCodeRepo::empty();
    let notifier = MockNotifier::working();
    let uc = request_usecase(
        codes.clone(),
        MockAccountGateway::with(vec![account.clone()]),
        notifier.clone(),
    );

    uc.execute(RequestPasswordResetInput {
        email: "grace@example.com".to_owned(),
        ip: "203.0.113.9".to_owned(),
    })
    .await
    .unwrap();

    let stored = codes.codes.lock().unwrap();
    assert_eq!(stored.len(), 1);
    assert_eq!(stored[0].purpose, VerificationPurpose::PasswordReset);
    assert_eq!(stored[0].user_id, Some(account.id));
    // Reset codes live 15 minutes, not 10
    assert!(stored[0].expires_at > Utc::now() + Duration::minutes(14));
    assert_eq!(
        notifier
            .sent_to("grace@example.com", Template::PasswordResetCode)
            .len(),
        1
    );
}

#[tokio::test]
async fn should_enforce_cooldown_between_reset_codes() {
    let account = test_account("grace@example.com", Role::Member);
    let uc = request_usecase(
        MockCodeRepo::empty(),
        MockAccountGateway::with(vec![account]),
        MockNotifier::working(),
    );
    let input = || RequestPasswordResetInput {
        email: "grace@example.com".to_owned(),
        ip: "203.0.113.9".to_owned(),
    };

    uc.execute(input()).await.unwrap();
    let result = uc.execute(input()).await;
    assert!(matches!(result, Err(GateError::CooldownActive)));
}

#[tokio::test]
async fn should_set_password_and_establish_session() {
    let account = test_account("grace@example.com", Role::Member);
    let mut code = stored_code("grace@example.com", VerificationPurpose::PasswordReset, "271828");
    code.user_id = Some(account.id);
    let codes = MockCodeRepo::with(vec![code]);
    let accounts = MockAccountGateway::with(vec![account.clone()]);
    accounts.set_password_for(account.id, "old password");
    let events = MockLoginEventRepo::empty();

    let uc = verify_usecase(codes.clone(), accounts.clone(), events.clone());
    let out = uc
        .execute(VerifyPasswordResetInput {
            email: "grace@example.com".to_owned(),
            code: "271828".to_owned(),
            new_password: "brand new password".to_owned(),
            ip: "203.0.113.9".to_owned(),
        })
        .await
        .unwrap();

    assert_eq!(out.user_id, account.id);
    assert_eq!(out.session_token, format!("session-{}", account.id));
    assert_eq!(
        accounts.passwords.lock().unwrap().get(&account.id).unwrap(),
        "brand new password"
    );
    assert!(codes.codes.lock().unwrap()[0].verified_at.is_some());
    // Reset implies login: a login event exists without a separate login call
    assert_eq!(events.events.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn should_lock_reset_code_after_repeated_failures() {
    let account = test_account("grace@example.com", Role::Member);
    let mut code = stored_code("grace@example.com", VerificationPurpose::PasswordReset, "271828");
    code.user_id = Some(account.id);
    let accounts = MockAccountGateway::with(vec![account.clone()]);
    accounts.set_password_for(account.id, "old password");

    let uc = verify_usecase(
        MockCodeRepo::with(vec![code]),
        accounts.clone(),
        MockLoginEventRepo::empty(),
    );
    let attempt = |code: &str| VerifyPasswordResetInput {
        email: "grace@example.com".to_owned(),
        code: code.to_owned(),
        new_password: "brand new password".to_owned(),
        ip: "203.0.113.9".to_owned(),
    };

    for _ in 0..4 {
        let result = uc.execute(attempt("000000")).await;
        assert!(matches!(result, Err(GateError::InvalidCode { .. })));
    }
    let result = uc.execute(attempt("000000")).await;
    assert!(matches!(result, Err(GateError::TooManyAttempts)));

    let result = uc.execute(attempt("271828")).await;
    assert!(matches!(result, Err(GateError::TooManyAttempts)));
    // The password never changed
    assert_eq!(
        accounts.passwords.lock().unwrap().get(&account.id).unwrap(),
        "old password"
    );
}

#[tokio::test]
async fn should_reject_expired_reset_code() {
    let account = test_account("grace@example.com", Role::Member);
    let mut code = stored_code("grace@example.com", VerificationPurpose::PasswordReset, "271828");
    code.user_id = Some(account.id);
    code.expires_at = Utc::now() - Duration::seconds(1);

    let uc = verify_usecase(
        MockCodeRepo::with(vec![code]),
        MockAccountGateway::with(vec![account]),
        MockLoginEventRepo::empty(),
    );
    let result = uc
        .execute(VerifyPasswordResetInput {
            email: "grace@example.com".to_owned(),
            code: "271828".to_owned(),
            new_password: "brand new password".to_owned(),
            ip: "203.0.113.9".to_owned(),
        })
        .await;
    assert!(matches!(result, Err(GateError::CodeNotFound)));
}
