//! HTML rendering for the page views.

use axum::response::Html;
use postboard_api::AppState;
use postboard_common::Page;
use postboard_core::{CommentEntry, PostEntry, ProfileFeed};
use postboard_db::entities::{group, user};

/// Escape text for use in HTML content and attribute values.
#[must_use]
pub fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#x27;")
}

/// Wrap `content` in the site layout.
#[must_use]
pub fn layout(title: &str, viewer: Option<&user::Model>, content: &str) -> Html<String> {
    let nav = match viewer {
        Some(u) => format!(
            "<a href=\"/create/\">New post</a> \
             <a href=\"/follow/\">Following</a> \
             <a href=\"/profile/{name}/\">{name}</a> \
             <a href=\"/auth/password_change/\">Change password</a> \
             <a href=\"/auth/logout/\">Log out</a>",
            name = escape(&u.username)
        ),
        None => "<a href=\"/auth/login/\">Log in</a> <a href=\"/auth/signup/\">Sign up</a>"
            .to_string(),
    };

    Html(format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>{title}</title>\n</head>\n<body>\n\
         <header><a href=\"/\">Postboard</a> <nav>{nav}</nav></header>\n\
         <main>\n{content}\n</main>\n</body>\n</html>\n",
        title = escape(title),
    ))
}

/// A post as shown in feeds and on its detail page.
#[must_use]
pub fn post_card(state: &AppState, entry: &PostEntry) -> String {
    let post = &entry.post;
    let mut html = String::from("<article class=\"post\">\n");

    html.push_str(&format!(
        "<p class=\"meta\">By <a href=\"/profile/{author}/\">{author}</a> on {date}</p>\n",
        author = escape(&entry.author),
        date = post.pub_date.format("%d %b %Y %H:%M"),
    ));

    if let Some(key) = &post.image {
        html.push_str(&format!(
            "<img src=\"{}\" alt=\"\">\n",
            escape(&state.post_service.image_url(key))
        ));
    }

    html.push_str(&format!("<p class=\"text\">{}</p>\n", escape(&post.text)));
    html.push_str(&format!(
        "<a href=\"/posts/{}/\">Details</a>\n",
        post.id
    ));

    if let Some(group) = &entry.group {
        html.push_str(&format!(
            " <a href=\"/group/{}/\">All posts of the group {}</a>\n",
            escape(&group.slug),
            escape(&group.title)
        ));
    }

    html.push_str("</article>\n");
    html
}

/// Posts of one page followed by the page navigation.
#[must_use]
pub fn post_list(state: &AppState, page: &Page<PostEntry>) -> String {
    let mut html = String::new();
    for entry in &page.items {
        html.push_str(&post_card(state, entry));
    }
    html.push_str(&paginator(page));
    html
}

/// Navigation between the pages of a feed.
#[must_use]
pub fn paginator<T>(page: &Page<T>) -> String {
    if !page.has_other_pages() {
        return String::new();
    }

    let mut html = String::from("<nav class=\"pagination\">\n");
    if let Some(prev) = page.previous_page_number() {
        html.push_str("<a href=\"?page=1\">First</a>\n");
        html.push_str(&format!("<a href=\"?page={prev}\">Previous</a>\n"));
    }
    html.push_str(&format!(
        "<span class=\"current\">Page {} of {}</span>\n",
        page.number, page.num_pages
    ));
    if let Some(next) = page.next_page_number() {
        html.push_str(&format!("<a href=\"?page={next}\">Next</a>\n"));
        html.push_str(&format!("<a href=\"?page={}\">Last</a>\n", page.num_pages));
    }
    html.push_str("</nav>\n");
    html
}

/// Header of a group page.
#[must_use]
pub fn group_header(group: &group::Model) -> String {
    format!(
        "<h1>{}</h1>\n<p class=\"description\">{}</p>\n",
        escape(&group.title),
        escape(&group.description)
    )
}

/// Header of a profile page, with the follow button when it applies.
#[must_use]
pub fn profile_header(feed: &ProfileFeed, viewer: Option<&user::Model>) -> String {
    let author = &feed.author;
    let full_name = format!("{} {}", author.first_name, author.last_name);
    let full_name = full_name.trim();
    let name = if full_name.is_empty() {
        author.username.as_str()
    } else {
        full_name
    };

    let mut html = format!(
        "<h1>All posts of {}</h1>\n<p>Posts: {}</p>\n<p>Comments on posts: {}</p>\n",
        escape(name),
        feed.post_count,
        feed.comment_count
    );

    let show_button = viewer.is_some_and(|v| v.id != author.id);
    if show_button {
        let username = escape(&author.username);
        if feed.following {
            html.push_str(&format!(
                "<a class=\"unfollow\" href=\"/profile/{username}/unfollow/\">Unfollow</a>\n"
            ));
        } else {
            html.push_str(&format!(
                "<a class=\"follow\" href=\"/profile/{username}/follow/\">Follow</a>\n"
            ));
        }
    }

    html
}

/// Comments under a post, with the form for signed-in viewers.
#[must_use]
pub fn comment_section(post_id: i32, comments: &[CommentEntry], can_comment: bool) -> String {
    let mut html = String::from("<section class=\"comments\">\n");

    if can_comment {
        html.push_str(&format!(
            "<form method=\"post\" action=\"/posts/{post_id}/comment/\">\n\
             <label for=\"id_text\">Add a comment</label>\n\
             <textarea name=\"text\" id=\"id_text\" required></textarea>\n\
             <button type=\"submit\">Send</button>\n</form>\n"
        ));
    }

    for entry in comments {
        html.push_str(&format!(
            "<div class=\"comment\"><a href=\"/profile/{author}/\">{author}</a> \
             <span>{created}</span><p>{text}</p></div>\n",
            author = escape(&entry.author),
            created = entry.comment.created.format("%d %b %Y %H:%M"),
            text = escape(&entry.comment.text),
        ));
    }

    html.push_str("</section>\n");
    html
}

/// Values shown in the post form.
#[derive(Debug, Default)]
pub struct PostFormView<'a> {
    pub text: &'a str,
    pub group_id: Option<i32>,
    pub error: Option<&'a str>,
    /// Set when editing an existing post.
    pub edit_id: Option<i32>,
}

/// Post create/edit form.
#[must_use]
pub fn post_form(form: &PostFormView<'_>, groups: &[group::Model]) -> String {
    let (heading, action, button) = match form.edit_id {
        Some(id) => ("Edit post", format!("/posts/{id}/edit/"), "Save"),
        None => ("New post", "/create/".to_string(), "Add"),
    };

    let mut options = String::from("<option value=\"\">---------</option>\n");
    for group in groups {
        let selected = if form.group_id == Some(group.id) {
            " selected"
        } else {
            ""
        };
        options.push_str(&format!(
            "<option value=\"{}\"{selected}>{}</option>\n",
            group.id,
            escape(&group.title)
        ));
    }

    format!(
        "<h1>{heading}</h1>\n{error}\
         <form method=\"post\" action=\"{action}\" enctype=\"multipart/form-data\">\n\
         <label for=\"id_text\">Text</label>\n\
         <textarea name=\"text\" id=\"id_text\" required>{text}</textarea>\n\
         <label for=\"id_group\">Group</label>\n\
         <select name=\"group\" id=\"id_group\">\n{options}</select>\n\
         <label for=\"id_image\">Image</label>\n\
         <input type=\"file\" name=\"image\" id=\"id_image\" accept=\"image/*\">\n\
         <button type=\"submit\">{button}</button>\n</form>\n",
        error = error_list(form.error),
        text = escape(form.text),
    )
}

/// Login form.
#[must_use]
pub fn login_form(username: &str, next: Option<&str>, error: Option<&str>) -> String {
    let next = next
        .map(|n| format!("<input type=\"hidden\" name=\"next\" value=\"{}\">\n", escape(n)))
        .unwrap_or_default();

    format!(
        "<h1>Log in</h1>\n{error}\
         <form method=\"post\" action=\"/auth/login/\">\n{next}\
         <label for=\"id_username\">Username</label>\n\
         <input type=\"text\" name=\"username\" id=\"id_username\" value=\"{username}\" required>\n\
         <label for=\"id_password\">Password</label>\n\
         <input type=\"password\" name=\"password\" id=\"id_password\" required>\n\
         <button type=\"submit\">Log in</button>\n</form>\n",
        error = error_list(error),
        username = escape(username),
    )
}

/// Signup form.
#[must_use]
pub fn signup_form(username: &str, email: &str, error: Option<&str>) -> String {
    format!(
        "<h1>Sign up</h1>\n{error}\
         <form method=\"post\" action=\"/auth/signup/\">\n\
         <label for=\"id_first_name\">First name</label>\n\
         <input type=\"text\" name=\"first_name\" id=\"id_first_name\">\n\
         <label for=\"id_last_name\">Last name</label>\n\
         <input type=\"text\" name=\"last_name\" id=\"id_last_name\">\n\
         <label for=\"id_username\">Username</label>\n\
         <input type=\"text\" name=\"username\" id=\"id_username\" value=\"{username}\" required>\n\
         <label for=\"id_email\">Email</label>\n\
         <input type=\"email\" name=\"email\" id=\"id_email\" value=\"{email}\">\n\
         <label for=\"id_password\">Password</label>\n\
         <input type=\"password\" name=\"password\" id=\"id_password\" required>\n\
         <button type=\"submit\">Sign up</button>\n</form>\n",
        error = error_list(error),
        username = escape(username),
        email = escape(email),
    )
}

/// Password change form.
#[must_use]
pub fn password_change_form(error: Option<&str>) -> String {
    format!(
        "<h1>Change password</h1>\n{error}\
         <form method=\"post\" action=\"/auth/password_change/\">\n\
         <label for=\"id_old_password\">Old password</label>\n\
         <input type=\"password\" name=\"old_password\" id=\"id_old_password\" required>\n\
         <label for=\"id_new_password1\">New password</label>\n\
         <input type=\"password\" name=\"new_password1\" id=\"id_new_password1\" required>\n\
         <label for=\"id_new_password2\">New password confirmation</label>\n\
         <input type=\"password\" name=\"new_password2\" id=\"id_new_password2\" required>\n\
         <button type=\"submit\">Change</button>\n</form>\n",
        error = error_list(error),
    )
}

fn error_list(error: Option<&str>) -> String {
    error
        .map(|e| format!("<ul class=\"errorlist\"><li>{}</li></ul>\n", escape(e)))
        .unwrap_or_default()
}
