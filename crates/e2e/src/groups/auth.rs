//! Authentication checks, including the password-reset state machine
//!
//! Reset flow: forgot-password issues an OTP (only visible when the server
//! runs in development mode), verify-otp trades it for a reset token, and
//! reset-password changes the learner password for the rest of the run.

use serde_json::json;
use tracing::info;

use crate::assertions::EXCERPT_LEN;
use crate::config::Credentials;
use crate::error::ProbeResult;
use crate::fixtures::{
    Account, AuthToken, Fixture, FixtureDelta, Fixtures, ResetState, Role, Skipped,
};
use crate::pipeline::{Harness, StageResult};
use crate::session::ApiRequest;

const INVALID_OTP: &str = "000000";

pub(super) fn signup_validation(h: &mut Harness, _: &Fixtures) -> StageResult {
    let signup = h.config().signup.clone();

    h.expect(
        "Signup - Invalid Email",
        400,
        ApiRequest::post("auth/signup").json(json!({
            "email": "invalid-email",
            "password": signup.password,
            "firstName": signup.first_name,
            "lastName": signup.last_name,
        })),
    )?;

    h.expect(
        "Signup - Short Password",
        400,
        ApiRequest::post("auth/signup").json(json!({
            "email": format!("short_{}@{}", h.run_id(), signup.email_domain),
            "password": "123",
            "firstName": signup.first_name,
            "lastName": signup.last_name,
        })),
    )?;

    h.expect(
        "Signup - Missing Fields",
        400,
        ApiRequest::post("auth/signup").json(json!({
            "email": format!("missing_{}@{}", h.run_id(), signup.email_domain),
        })),
    )?;

    Ok(FixtureDelta::none())
}

pub(super) fn signup_success(h: &mut Harness, _: &Fixtures) -> StageResult {
    let signup = h.config().signup.clone();
    let email = format!("{}_{}@{}", signup.email_prefix, h.run_id(), signup.email_domain);

    let request = ApiRequest::post("auth/signup").json(json!({
        "email": email,
        "password": signup.password,
        "firstName": signup.first_name,
        "lastName": signup.last_name,
        "displayName": format!("{} {}", signup.first_name, signup.last_name),
    }));

    let Some(resp) = h.expect("Signup - Valid Data", 201, request)? else {
        return Ok(FixtureDelta::none());
    };
    if !h.require_fields("Signup - Response Shape", &resp, &["/token", "/user", "/user/id"]) {
        return Ok(FixtureDelta::none());
    }

    let (Some(id), Some(token)) = (resp.string_at("/user/id"), resp.string_at("/token")) else {
        h.recorder_mut()
            .fail("Signup - Response Shape", "token or user id is empty", None);
        return Ok(FixtureDelta::none());
    };

    info!("Registered {}", email);
    Ok(Fixture::SignupAccount(Account {
        id,
        email,
        password: signup.password,
        token: AuthToken::new(Role::User, token),
    })
    .into())
}

pub(super) fn signup_round_trip(h: &mut Harness, f: &Fixtures) -> StageResult {
    let account = f.signup_account()?;

    let login = h.expect(
        "Signup Round Trip - Login",
        200,
        ApiRequest::post("auth/login").json(account.credentials().body()),
    )?;
    let Some(token) = login.and_then(|resp| resp.string_at("/token")) else {
        return Ok(FixtureDelta::none());
    };

    if let Some(me) = h.expect(
        "Signup Round Trip - Get Me",
        200,
        ApiRequest::get("auth/me").bearer(token),
    )? {
        let id = me.string_at("/id");
        let email = me.string_at("/email");
        h.check("Signup Round Trip - Identity", id.as_deref() == Some(account.id.as_str()), || {
            format!("expected id {}, got {:?}", account.id, id)
        });
        h.check(
            "Signup Round Trip - Email",
            email.is_some_and(|e| e.eq_ignore_ascii_case(&account.email)),
            || format!("expected email {}", account.email),
        );
    }

    Ok(FixtureDelta::none())
}

pub(super) fn login_validation(h: &mut Harness, _: &Fixtures) -> StageResult {
    let domain = h.config().signup.email_domain.clone();
    let known_email = h.config().user.email.clone();

    h.expect(
        "Login - Invalid Credentials",
        401,
        ApiRequest::post("auth/login").json(
            Credentials::new(format!("nonexistent_{}@{}", h.run_id(), domain), "wrongpassword")
                .body(),
        ),
    )?;

    h.expect(
        "Login - Wrong Password",
        401,
        ApiRequest::post("auth/login").json(Credentials::new(known_email, "wrongpassword").body()),
    )?;

    h.expect(
        "Login - Missing Password",
        400,
        ApiRequest::post("auth/login").json(json!({ "email": format!("test@{}", domain) })),
    )?;

    Ok(FixtureDelta::none())
}

pub(super) fn login_success(h: &mut Harness, f: &Fixtures) -> StageResult {
    let mut delta = FixtureDelta::none();

    let admin = h.config().admin.clone();
    if let Some(token) = login_for_token(h, "Admin Login", &admin)? {
        delta.push(Fixture::Token(AuthToken::new(Role::Admin, token)));
    }

    let user = f.user_credentials(h.config());
    if let Some(token) = login_for_token(h, "User Login", &user)? {
        delta.push(Fixture::Token(AuthToken::new(Role::User, token)));
    }

    Ok(delta)
}

fn login_for_token(
    h: &mut Harness,
    name: &str,
    credentials: &Credentials,
) -> ProbeResult<Option<String>> {
    let request = ApiRequest::post("auth/login").json(credentials.body());
    let Some(resp) = h.expect(name, 200, request)? else {
        return Ok(None);
    };
    let token = resp.string_at("/token");
    if token.is_none() {
        h.recorder_mut().fail(
            &format!("{} - Token", name),
            "token not found in response",
            Some(resp.excerpt(EXCERPT_LEN)),
        );
    }
    Ok(token)
}

pub(super) fn me_without_token(h: &mut Harness, _: &Fixtures) -> StageResult {
    h.expect("Get Me - No Token", 401, ApiRequest::get("auth/me"))?;
    Ok(FixtureDelta::none())
}

pub(super) fn me_invalid_token(h: &mut Harness, _: &Fixtures) -> StageResult {
    h.expect(
        "Get Me - Invalid Token",
        401,
        ApiRequest::get("auth/me").bearer("invalid.token.value"),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn me_with_token(h: &mut Harness, f: &Fixtures) -> StageResult {
    let token = f.token(Role::User)?;
    let request = ApiRequest::get("auth/me").auth(token);
    if let Some(resp) = h.expect("Get Me - With Token", 200, request)? {
        h.require_fields("Get Me - User Data", &resp, &["/id", "/email"]);
    }
    Ok(FixtureDelta::none())
}

pub(super) fn profile_update(h: &mut Harness, f: &Fixtures) -> StageResult {
    let token = f.token(Role::User)?;
    h.expect(
        "Update Profile",
        200,
        ApiRequest::put("auth/profile").auth(token).json(json!({
            "firstName": "Updated",
            "lastName": "Name",
            "displayName": "Updated Name",
        })),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn forgot_password(h: &mut Harness, _: &Fixtures) -> StageResult {
    if !h.config().password_reset.enabled {
        return Err(Skipped::missing("password reset (disabled in config)").into());
    }
    let email = h.config().user.email.clone();

    let mut delta = FixtureDelta::none();
    if let Some(resp) = h.expect(
        "Forgot Password - Valid Email",
        200,
        ApiRequest::post("auth/forgot-password").json(json!({ "email": email })),
    )? {
        match resp.string_at("/otp") {
            Some(otp) => {
                info!("OTP received from development-mode server");
                delta.push(Fixture::Otp(otp));
            }
            None => info!("Server did not expose an OTP, reset flow will be skipped"),
        }
    }

    h.expect(
        "Forgot Password - Invalid Email",
        400,
        ApiRequest::post("auth/forgot-password").json(json!({ "email": "invalid-email" })),
    )?;

    Ok(delta)
}

pub(super) fn verify_otp(h: &mut Harness, f: &Fixtures) -> StageResult {
    let otp = f.otp()?;
    let email = h.config().user.email.clone();

    let mut delta = FixtureDelta::none();
    if let Some(resp) = h.expect(
        "Verify OTP - Valid",
        200,
        ApiRequest::post("auth/verify-otp").json(json!({ "email": email, "otp": otp })),
    )? {
        match resp.string_at("/resetToken") {
            Some(token) => delta.push(Fixture::ResetToken(token)),
            None => h.recorder_mut().fail(
                "Verify OTP - Reset Token",
                "resetToken not found in response",
                Some(resp.excerpt(EXCERPT_LEN)),
            ),
        }
    }

    let wrong = if otp == INVALID_OTP { "999999" } else { INVALID_OTP };
    h.expect(
        "Verify OTP - Invalid",
        400,
        ApiRequest::post("auth/verify-otp").json(json!({ "email": email, "otp": wrong })),
    )?;

    Ok(delta)
}

pub(super) fn reset_password(h: &mut Harness, f: &Fixtures) -> StageResult {
    let token = f.reset_token()?;
    let new_password = h.config().password_reset.new_password.clone();

    let resp = h.expect(
        "Reset Password - Valid",
        200,
        ApiRequest::post("auth/reset-password").json(json!({
            "token": token,
            "newPassword": new_password,
        })),
    )?;

    if resp.is_some() {
        info!("Password reset successful, learner credentials updated");
        Ok(Fixture::UserPassword(new_password).into())
    } else {
        Ok(FixtureDelta::none())
    }
}

pub(super) fn login_after_reset(h: &mut Harness, f: &Fixtures) -> StageResult {
    if f.reset_state() != ResetState::PasswordChanged {
        return Err(Skipped::missing("password change").into());
    }
    let credentials = f.user_credentials(h.config());
    h.expect(
        "Login After Reset",
        200,
        ApiRequest::post("auth/login").json(credentials.body()),
    )?;
    Ok(FixtureDelta::none())
}

pub(super) fn google_validation(h: &mut Harness, _: &Fixtures) -> StageResult {
    h.expect(
        "Google Auth - Missing Credential",
        400,
        ApiRequest::post("auth/google").json(json!({})),
    )?;

    let expected = h.config().expectations.google_invalid_credential_status;
    h.expect(
        "Google Auth - Invalid Credential",
        expected,
        ApiRequest::post("auth/google").json(json!({ "credential": "invalid_token" })),
    )?;

    Ok(FixtureDelta::none())
}
