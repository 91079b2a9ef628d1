use chrono::{Duration, Utc};
use uuid::Uuid;

use foyer_gate::domain::types::{ApprovalAction, Role, Template};
use foyer_gate::error::GateError;
use foyer_gate::usecase::approval::{
    issue_tokens, AdminDecisionInput, AdminDecisionUseCase, ApprovalStatus, AutoLoginInput,
    AutoLoginUseCase, CheckApprovalStatusUseCase, ConsumeApprovalTokenInput,
    ConsumeApprovalTokenUseCase, ResendApprovalInput, ResendApprovalUseCase,
};

use crate::helpers::{
    MockAccountGateway, MockApprovalTokenRepo, MockDecisionRepo, MockLoginEventRepo, MockNotifier,
    stored_token, test_account,
};

const ADMINS: [&str; 2] = ["root@example.com", "ops@example.com"];

fn consume_usecase(
    tokens: MockApprovalTokenRepo,
    decisions: MockDecisionRepo,
    accounts: MockAccountGateway,
    notifier: MockNotifier,
) -> ConsumeApprovalTokenUseCase<
    MockApprovalTokenRepo,
    MockDecisionRepo,
    MockAccountGateway,
    MockNotifier,
> {
    ConsumeApprovalTokenUseCase {
        tokens,
        decisions,
        accounts,
        notifier,
        admin_emails: ADMINS.iter().map(|s| s.to_string()).collect(),
    }
}

fn consume_input(token: &str, expected_action: ApprovalAction) -> ConsumeApprovalTokenInput {
    ConsumeApprovalTokenInput {
        token: token.to_owned(),
        expected_action,
        actor: None,
    }
}

#[tokio::test]
async fn should_approve_and_promote_on_approve_token() {
    let applicant = {
        let mut a = test_account("grace@example.com", Role::Guest);
        a.email_verified = false;
        a
    };
    let token = stored_token(applicant.id, ApprovalAction::Approve);
    let tokens = MockApprovalTokenRepo::with(vec![token.clone()]);
    let decisions = MockDecisionRepo::empty();
    let accounts = MockAccountGateway::with(vec![applicant.clone()]);
    let notifier = MockNotifier::working();

    let uc = consume_usecase(
        tokens.clone(),
        decisions.clone(),
        accounts.clone(),
        notifier.clone(),
    );
    let out = uc
        .execute(consume_input(&token.token, ApprovalAction::Approve))
        .await
        .unwrap();

    assert!(out.approved);
    assert_eq!(out.user_id, applicant.id);

    let decision = decisions.decisions.lock().unwrap()[&applicant.id].clone();
    assert!(decision.approved);

    let updated = accounts.account(applicant.id).unwrap();
    assert_eq!(updated.role, Role::Member);
    assert!(!updated.suspended);
    assert_eq!(
        accounts.approval_flags.lock().unwrap().get(&applicant.id),
        Some(&true)
    );

    assert!(tokens.tokens.lock().unwrap()[0].used_at.is_some());
    assert_eq!(
        notifier
            .sent_to("grace@example.com", Template::AccountApproved)
            .len(),
        1
    );
    // No actor identity on the token path, so every admin is notified
    for admin in ADMINS {
        assert_eq!(notifier.sent_to(admin, Template::AdminActionNotice).len(), 1);
    }
}

#[tokio::test]
async fn should_deny_and_suspend_on_deny_token() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let token = stored_token(applicant.id, ApprovalAction::Deny);
    let accounts = MockAccountGateway::with(vec![applicant.clone()]);
    let notifier = MockNotifier::working();

    let uc = consume_usecase(
        MockApprovalTokenRepo::with(vec![token.clone()]),
        MockDecisionRepo::empty(),
        accounts.clone(),
        notifier.clone(),
    );
    let out = uc
        .execute(consume_input(&token.token, ApprovalAction::Deny))
        .await
        .unwrap();

    assert!(!out.approved);
    let updated = accounts.account(applicant.id).unwrap();
    assert!(updated.suspended);
    assert_eq!(updated.role, Role::Guest);
    assert_eq!(
        notifier
            .sent_to("grace@example.com", Template::AccountDenied)
            .len(),
        1
    );
}

#[tokio::test]
async fn should_report_diagnostics_in_order() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let accounts = MockAccountGateway::with(vec![applicant.clone()]);

    // Unknown token
    let uc = consume_usecase(
        MockApprovalTokenRepo::empty(),
        MockDecisionRepo::empty(),
        accounts.clone(),
        MockNotifier::working(),
    );
    let result = uc
        .execute(consume_input("no-such-token", ApprovalAction::Approve))
        .await;
    assert!(matches!(result, Err(GateError::TokenNotFound)));

    // Wrong link type, checked before used/expired and non-consuming
    let mut used_and_wrong = stored_token(applicant.id, ApprovalAction::Deny);
    used_and_wrong.used_at = Some(Utc::now());
    let tokens = MockApprovalTokenRepo::with(vec![used_and_wrong.clone()]);
    let uc = consume_usecase(
        tokens,
        MockDecisionRepo::empty(),
        accounts.clone(),
        MockNotifier::working(),
    );
    let result = uc
        .execute(consume_input(&used_and_wrong.token, ApprovalAction::Approve))
        .await;
    assert!(matches!(result, Err(GateError::TokenWrongType)));

    // Expired
    let mut expired = stored_token(applicant.id, ApprovalAction::Approve);
    expired.expires_at = Utc::now() - Duration::seconds(1);
    let uc = consume_usecase(
        MockApprovalTokenRepo::with(vec![expired.clone()]),
        MockDecisionRepo::empty(),
        accounts,
        MockNotifier::working(),
    );
    let result = uc
        .execute(consume_input(&expired.token, ApprovalAction::Approve))
        .await;
    assert!(matches!(result, Err(GateError::TokenExpired)));
}

#[tokio::test]
async fn should_leave_token_unused_after_wrong_type_hit() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let approve = stored_token(applicant.id, ApprovalAction::Approve);
    let tokens = MockApprovalTokenRepo::with(vec![approve.clone()]);
    let uc = consume_usecase(
        tokens.clone(),
        MockDecisionRepo::empty(),
        MockAccountGateway::with(vec![applicant]),
        MockNotifier::working(),
    );

    let result = uc
        .execute(consume_input(&approve.token, ApprovalAction::Deny))
        .await;
    assert!(matches!(result, Err(GateError::TokenWrongType)));
    assert!(
        tokens.tokens.lock().unwrap()[0].used_at.is_none(),
        "a wrong-type hit must not burn the token"
    );

    // The correctly typed consume still goes through afterwards
    let result = uc
        .execute(consume_input(&approve.token, ApprovalAction::Approve))
        .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn should_name_previous_decider_on_reused_token() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let admin = {
        let mut a = test_account("root@example.com", Role::Privileged);
        a.display_name = "Ada".to_owned();
        a
    };
    let token = stored_token(applicant.id, ApprovalAction::Approve);
    let tokens = MockApprovalTokenRepo::with(vec![token.clone()]);
    let accounts = MockAccountGateway::with(vec![applicant.clone(), admin.clone()]);

    let uc = consume_usecase(
        tokens,
        MockDecisionRepo::empty(),
        accounts,
        MockNotifier::working(),
    );
    uc.execute(ConsumeApprovalTokenInput {
        token: token.token.clone(),
        expected_action: ApprovalAction::Approve,
        actor: Some(admin.id),
    })
    .await
    .unwrap();

    let second = uc
        .execute(consume_input(&token.token, ApprovalAction::Approve))
        .await;
    match second {
        Err(GateError::TokenAlreadyUsed(detail)) => {
            assert!(detail.contains("already approved by Ada"), "got: {detail}");
        }
        other => panic!("expected TokenAlreadyUsed, got {other:?}"),
    }
}

#[tokio::test]
async fn should_let_last_decision_win() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let approve = stored_token(applicant.id, ApprovalAction::Approve);
    let deny = stored_token(applicant.id, ApprovalAction::Deny);
    let decisions = MockDecisionRepo::empty();
    let accounts = MockAccountGateway::with(vec![applicant.clone()]);

    let uc = consume_usecase(
        MockApprovalTokenRepo::with(vec![approve.clone(), deny.clone()]),
        decisions.clone(),
        accounts.clone(),
        MockNotifier::working(),
    );
    uc.execute(consume_input(&approve.token, ApprovalAction::Approve))
        .await
        .unwrap();
    uc.execute(consume_input(&deny.token, ApprovalAction::Deny))
        .await
        .unwrap();

    let decision = decisions.decisions.lock().unwrap()[&applicant.id].clone();
    assert!(!decision.approved);
    assert!(accounts.account(applicant.id).unwrap().suspended);

    let status = CheckApprovalStatusUseCase {
        decisions: decisions.clone(),
    };
    let out = status.execute(applicant.id).await.unwrap();
    assert_eq!(out.status, ApprovalStatus::Denied);
    assert!(out.decided_at.is_some());
}

#[tokio::test]
async fn should_clear_suspension_when_approval_follows_denial() {
    let mut applicant = test_account("grace@example.com", Role::Guest);
    applicant.suspended = true;
    let approve = stored_token(applicant.id, ApprovalAction::Approve);
    let accounts = MockAccountGateway::with(vec![applicant.clone()]);

    let uc = consume_usecase(
        MockApprovalTokenRepo::with(vec![approve.clone()]),
        MockDecisionRepo::empty(),
        accounts.clone(),
        MockNotifier::working(),
    );
    uc.execute(consume_input(&approve.token, ApprovalAction::Approve))
        .await
        .unwrap();

    assert!(!accounts.account(applicant.id).unwrap().suspended);
}

#[tokio::test]
async fn should_never_downgrade_or_suspend_privileged_accounts() {
    let admin_target = test_account("boss@example.com", Role::Privileged);
    let deny = stored_token(admin_target.id, ApprovalAction::Deny);
    let accounts = MockAccountGateway::with(vec![admin_target.clone()]);

    let uc = consume_usecase(
        MockApprovalTokenRepo::with(vec![deny.clone()]),
        MockDecisionRepo::empty(),
        accounts.clone(),
        MockNotifier::working(),
    );
    uc.execute(consume_input(&deny.token, ApprovalAction::Deny))
        .await
        .unwrap();

    let unchanged = accounts.account(admin_target.id).unwrap();
    assert_eq!(unchanged.role, Role::Privileged);
    assert!(!unchanged.suspended);
}

#[tokio::test]
async fn should_give_exactly_one_winner_on_double_consumption() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let token = stored_token(applicant.id, ApprovalAction::Approve);
    let uc = consume_usecase(
        MockApprovalTokenRepo::with(vec![token.clone()]),
        MockDecisionRepo::empty(),
        MockAccountGateway::with(vec![applicant]),
        MockNotifier::working(),
    );

    let first = uc
        .execute(consume_input(&token.token, ApprovalAction::Approve))
        .await;
    let second = uc
        .execute(consume_input(&token.token, ApprovalAction::Approve))
        .await;

    assert!(first.is_ok());
    assert!(matches!(second, Err(GateError::TokenAlreadyUsed(_))));
}

#[tokio::test]
async fn should_invalidate_old_tokens_on_reissue() {
    let user_id = Uuid::new_v4();
    let repo = MockApprovalTokenRepo::empty();

    let first = issue_tokens(&repo, user_id).await.unwrap();
    let second = issue_tokens(&repo, user_id).await.unwrap();
    assert_ne!(first.approve, second.approve);

    let stale = {
        let tokens = repo.tokens.lock().unwrap();
        tokens
            .iter()
            .find(|t| t.token == first.approve)
            .cloned()
            .unwrap()
    };
    assert!(stale.used_at.is_some(), "reissue must retire the old token");

    let fresh = {
        let tokens = repo.tokens.lock().unwrap();
        tokens
            .iter()
            .find(|t| t.token == second.approve)
            .cloned()
            .unwrap()
    };
    assert!(fresh.used_at.is_none());
}

#[tokio::test]
async fn should_exclude_acting_admin_from_action_notice() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let actor = test_account("root@example.com", Role::Privileged);
    let accounts = MockAccountGateway::with(vec![applicant.clone(), actor.clone()]);
    let notifier = MockNotifier::working();

    let uc = AdminDecisionUseCase {
        decisions: MockDecisionRepo::empty(),
        accounts,
        notifier: notifier.clone(),
        admin_emails: ADMINS.iter().map(|s| s.to_string()).collect(),
    };
    uc.execute(AdminDecisionInput {
        user_id: applicant.id,
        approved: true,
        actor: actor.id,
    })
    .await
    .unwrap();

    assert!(
        notifier
            .sent_to("root@example.com", Template::AdminActionNotice)
            .is_empty(),
        "the actor already knows what they did"
    );
    assert_eq!(
        notifier
            .sent_to("ops@example.com", Template::AdminActionNotice)
            .len(),
        1
    );
}

#[tokio::test]
async fn should_forbid_admin_decision_from_non_privileged_actor() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let actor = test_account("peon@example.com", Role::Member);
    let uc = AdminDecisionUseCase {
        decisions: MockDecisionRepo::empty(),
        accounts: MockAccountGateway::with(vec![applicant.clone(), actor.clone()]),
        notifier: MockNotifier::working(),
        admin_emails: vec![],
    };

    let result = uc
        .execute(AdminDecisionInput {
            user_id: applicant.id,
            approved: true,
            actor: actor.id,
        })
        .await;
    assert!(matches!(result, Err(GateError::Forbidden)));
}

#[tokio::test]
async fn should_log_user_in_once_via_auto_login_token() {
    let user = test_account("grace@example.com", Role::Member);
    let token = stored_token(user.id, ApprovalAction::AutoLogin);
    let events = MockLoginEventRepo::empty();
    let uc = AutoLoginUseCase {
        tokens: MockApprovalTokenRepo::with(vec![token.clone()]),
        accounts: MockAccountGateway::with(vec![user.clone()]),
        login_events: events.clone(),
    };

    let out = uc
        .execute(AutoLoginInput {
            token: token.token.clone(),
            ip: "203.0.113.9".to_owned(),
        })
        .await
        .unwrap();
    assert_eq!(out.user_id, user.id);
    assert_eq!(
        events.events.lock().unwrap()[0].social_provider.as_deref(),
        Some("auto_login")
    );

    let second = uc
        .execute(AutoLoginInput {
            token: token.token,
            ip: "203.0.113.9".to_owned(),
        })
        .await;
    assert!(matches!(second, Err(GateError::TokenAlreadyUsed(_))));
}

#[tokio::test]
async fn should_refuse_auto_login_for_suspended_account() {
    let mut user = test_account("grace@example.com", Role::Guest);
    user.suspended = true;
    let token = stored_token(user.id, ApprovalAction::AutoLogin);
    let uc = AutoLoginUseCase {
        tokens: MockApprovalTokenRepo::with(vec![token.clone()]),
        accounts: MockAccountGateway::with(vec![user]),
        login_events: MockLoginEventRepo::empty(),
    };

    let result = uc
        .execute(AutoLoginInput {
            token: token.token,
            ip: "203.0.113.9".to_owned(),
        })
        .await;
    assert!(matches!(result, Err(GateError::AccountSuspended)));
}

#[tokio::test]
async fn should_reissue_and_remail_on_resend() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let mut expired = stored_token(applicant.id, ApprovalAction::Approve);
    expired.expires_at = Utc::now() - Duration::days(1);
    let tokens = MockApprovalTokenRepo::with(vec![expired.clone()]);
    let notifier = MockNotifier::working();

    let uc = ResendApprovalUseCase {
        tokens: tokens.clone(),
        decisions: MockDecisionRepo::empty(),
        accounts: MockAccountGateway::with(vec![applicant]),
        notifier: notifier.clone(),
        base_url: "https://example.com".to_owned(),
        admin_emails: ADMINS.iter().map(|s| s.to_string()).collect(),
    };
    uc.execute(ResendApprovalInput {
        token: expired.token,
    })
    .await
    .unwrap();

    // Fresh approve/deny/auto_login triple on top of the stale token
    assert_eq!(tokens.tokens.lock().unwrap().len(), 4);
    for admin in ADMINS {
        assert_eq!(
            notifier.sent_to(admin, Template::AdminApprovalRequest).len(),
            1
        );
    }
}

#[tokio::test]
async fn should_refuse_resend_once_decided() {
    let applicant = test_account("grace@example.com", Role::Guest);
    let stale = stored_token(applicant.id, ApprovalAction::Approve);
    let decisions = MockDecisionRepo::with(foyer_gate::domain::types::ApprovalDecision {
        user_id: applicant.id,
        approved: true,
        decided_by: None,
        decided_at: Utc::now(),
    });

    let uc = ResendApprovalUseCase {
        tokens: MockApprovalTokenRepo::with(vec![stale.clone()]),
        decisions,
        accounts: MockAccountGateway::with(vec![applicant]),
        notifier: MockNotifier::working(),
        base_url: "https://example.com".to_owned(),
        admin_emails: vec![],
    };
    let result = uc.execute(ResendApprovalInput { token: stale.token }).await;
    assert!(matches!(result, Err(GateError::TokenAlreadyUsed(_))));
}
