//! Account pages: login, logout, signup and password change.

use axum::{
    Form,
    extract::{Query, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use postboard_api::{
    AppState, SESSION_COOKIE,
    extractors::{AuthUser, MaybeAuthUser},
};
use postboard_common::AppError;
use postboard_core::{ChangePasswordInput, SignupInput};

use crate::{
    error::PageResult,
    forms::{LoginForm, NextQuery, PasswordChangeForm, SignupForm},
    guard::{found, safe_next},
    render,
};

/// `GET /auth/login/`.
pub async fn login_page(
    MaybeAuthUser(viewer): MaybeAuthUser,
    Query(query): Query<NextQuery>,
) -> Response {
    let content = render::login_form("", query.next.as_deref(), None);
    render::layout("Log in", viewer.as_ref(), &content).into_response()
}

/// `POST /auth/login/`: set the session cookie and go to `next`.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> PageResult {
    match state.user_service.login(&form.username, &form.password).await {
        Ok((user, token)) => {
            tracing::info!(user_id = user.id, "User logged in");
            let cookie = Cookie::build((SESSION_COOKIE, token))
                .path("/")
                .http_only(true)
                .same_site(SameSite::Lax);
            let target = safe_next(form.next.as_deref()).to_string();
            Ok((jar.add(cookie), found(&target)).into_response())
        }
        Err(AppError::Unauthorized) => {
            let content = render::login_form(
                &form.username,
                form.next.as_deref(),
                Some("Please enter a correct username and password."),
            );
            Ok(render::layout("Log in", None, &content).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// `/auth/logout/`: revoke the token and drop the cookie.
pub async fn logout(
    State(state): State<AppState>,
    MaybeAuthUser(viewer): MaybeAuthUser,
    jar: CookieJar,
) -> PageResult {
    if let Some(user) = viewer {
        state.user_service.logout(user.id).await?;
    }

    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    let content = "<h1>Logged out</h1>\n<p>You have been logged out. \
                   <a href=\"/auth/login/\">Log in again</a></p>\n";
    Ok((jar, render::layout("Logged out", None, content)).into_response())
}

/// `GET /auth/signup/`.
pub async fn signup_page(MaybeAuthUser(viewer): MaybeAuthUser) -> Response {
    let content = render::signup_form("", "", None);
    render::layout("Sign up", viewer.as_ref(), &content).into_response()
}

/// `POST /auth/signup/`: create the account and go to the login page.
pub async fn signup(State(state): State<AppState>, Form(form): Form<SignupForm>) -> PageResult {
    let input = SignupInput {
        username: form.username.clone(),
        password: form.password,
        email: Some(form.email.clone()).filter(|e| !e.trim().is_empty()),
        first_name: form.first_name,
        last_name: form.last_name,
    };

    match state.user_service.signup(input).await {
        Ok(_) => Ok(found(&state.site.login_url)),
        Err(AppError::Validation(message)) => {
            let content = render::signup_form(&form.username, &form.email, Some(message.as_str()));
            Ok(render::layout("Sign up", None, &content).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /auth/password_change/`.
pub async fn password_change_page(AuthUser(user): AuthUser) -> Response {
    let content = render::password_change_form(None);
    render::layout("Change password", Some(&user), &content).into_response()
}

/// `POST /auth/password_change/`.
pub async fn password_change(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Form(form): Form<PasswordChangeForm>,
) -> PageResult {
    let result = if form.new_password1 == form.new_password2 {
        let input = ChangePasswordInput {
            old_password: form.old_password,
            new_password: form.new_password1,
        };
        state.user_service.change_password(&user, input).await
    } else {
        Err(AppError::Validation(
            "new_password2: the two password fields didn't match".to_string(),
        ))
    };

    match result {
        Ok(()) => Ok(found("/auth/password_change/done/")),
        Err(AppError::Validation(message)) => {
            let content = render::password_change_form(Some(message.as_str()));
            Ok(render::layout("Change password", Some(&user), &content).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /auth/password_change/done/`.
pub async fn password_change_done(AuthUser(user): AuthUser) -> Response {
    let content = "<h1>Password changed</h1>\n<p>Your password was changed.</p>\n";
    render::layout("Password changed", Some(&user), content).into_response()
}
