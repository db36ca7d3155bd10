//! Tests for the template engine

use super::*;
use crate::models::{Address, BlogPost, CategorizedPosts, Category, UserRole};
use std::fs;
use tempfile::TempDir;
use tera::Context as TeraContext;

fn engine() -> TemplateEngine {
    TemplateEngine::embedded().expect("embedded templates should load")
}

fn sample_user(role: UserRole) -> User {
    User {
        id: 1,
        first_name: "Jane".to_string(),
        last_name: "Doe".to_string(),
        profile_picture: Some("uploads/jane.png".to_string()),
        username: "drjane".to_string(),
        email: "jane@example.com".to_string(),
        password_hash: "hash".to_string(),
        address: Address::default(),
        role,
        created_at: chrono::Utc::now(),
    }
}

fn sample_post(id: i64, title: &str, category: Category, is_draft: bool) -> BlogPost {
    BlogPost {
        id,
        title: title.to_string(),
        image: None,
        category,
        summary: "one two three four five six".to_string(),
        content: "Body".to_string(),
        is_draft,
        author_id: 1,
        created_at: chrono::Utc::now(),
    }
}

fn dashboard_context(user: &User, posts: Vec<BlogPost>) -> TeraContext {
    let mut context = TeraContext::new();
    context.insert("user", &CurrentUser::from(user));
    context.insert("categorized_blogs", &CategorizedPosts::from_posts(posts));
    context.insert(
        "categories",
        &Category::ALL.iter().map(|c| c.label()).collect::<Vec<_>>(),
    );
    context.insert("summary_words", &3);
    context
}

#[test]
fn test_embedded_templates_present() {
    let engine = engine();
    for name in [
        "base.html",
        "login.html",
        "signup.html",
        "doctor_dashboard.html",
        "patient_dashboard.html",
    ] {
        assert!(engine.has_template(name), "missing {name}");
    }
}

#[test]
fn test_login_page_shows_flash() {
    let engine = engine();
    let mut context = TeraContext::new();
    context.insert("username", "");
    let vars = StandardTemplateVars::new("Vitalog", "/login")
        .with_flash(Some(FlashMessage::success("Registration successful! Please log in.")));

    let html = engine.render_page("login.html", &context, &vars).unwrap();

    assert!(html.contains("flash-success"));
    assert!(html.contains("Registration successful! Please log in."));
    assert!(html.contains("action=\"/login\""));
}

#[test]
fn test_signup_page_lists_roles_and_keeps_input() {
    let engine = engine();
    let mut context = TeraContext::new();
    let mut form = std::collections::HashMap::new();
    for key in [
        "first_name",
        "last_name",
        "username",
        "email",
        "address_line1",
        "city",
        "state",
        "pincode",
    ] {
        form.insert(key, String::new());
    }
    form.insert("username", "drjane".to_string());
    form.insert("user_type", "Patient".to_string());
    context.insert("form", &form);
    context.insert("roles", &["Doctor", "Patient"]);
    context.insert("error", "Username or email already exists. Please try again.");

    let html = engine
        .render_page("signup.html", &context, &StandardTemplateVars::new("Vitalog", "/signup"))
        .unwrap();

    assert!(html.contains("value=\"drjane\""));
    assert!(html.contains("<option value=\"Patient\" selected>"));
    assert!(html.contains("Username or email already exists"));
    assert!(html.contains("multipart/form-data"));
}

#[test]
fn test_patient_dashboard_groups_posts() {
    let engine = engine();
    let user = sample_user(UserRole::Patient);
    let context = dashboard_context(
        &user,
        vec![
            sample_post(1, "Heart Health 101", Category::HeartDisease, false),
            sample_post(2, "Flu shots", Category::Immunization, false),
        ],
    );
    let vars = StandardTemplateVars::new("Vitalog", "/patient_dashboard").with_user(&user);

    let html = engine.render_page("patient_dashboard.html", &context, &vars).unwrap();

    let mental = html.find("id=\"mental-health\"").unwrap();
    let heart = html.find("id=\"heart-disease\"").unwrap();
    let covid = html.find("id=\"covid-19\"").unwrap();
    let immunization = html.find("id=\"immunization\"").unwrap();
    assert!(mental < heart && heart < covid && covid < immunization);

    let post = html.find("Heart Health 101").unwrap();
    assert!(heart < post && post < covid);
    assert!(html.contains("one two three..."));
}

#[test]
fn test_doctor_dashboard_marks_drafts() {
    let engine = engine();
    let user = sample_user(UserRole::Doctor);
    let context = dashboard_context(
        &user,
        vec![sample_post(1, "Unfinished", Category::MentalHealth, true)],
    );
    let vars = StandardTemplateVars::new("Vitalog", "/doctor_dashboard").with_user(&user);

    let html = engine.render_page("doctor_dashboard.html", &context, &vars).unwrap();

    assert!(html.contains("Unfinished"));
    assert!(html.contains("badge\">Draft"));
    assert!(html.contains("<option value=\"Covid-19\">"));
    assert!(html.contains("name=\"draft\""));
}

#[test]
fn test_user_content_is_escaped() {
    let engine = engine();
    let user = sample_user(UserRole::Patient);
    let context = dashboard_context(
        &user,
        vec![sample_post(1, "<script>alert(1)</script>", Category::Covid19, false)],
    );
    let vars = StandardTemplateVars::new("Vitalog", "/patient_dashboard").with_user(&user);

    let html = engine.render_page("patient_dashboard.html", &context, &vars).unwrap();

    assert!(!html.contains("<script>alert(1)</script>"));
    assert!(html.contains("&lt;script&gt;"));
}

#[test]
fn test_simple_error_page_escapes() {
    let html = TemplateEngine::simple_error_page("Oops", "<b>bad</b>");
    assert!(html.contains("&lt;b&gt;bad&lt;&#x2F;b&gt;") || html.contains("&lt;b&gt;bad&lt;/b&gt;"));
    assert!(!html.contains("<b>bad</b>"));
}

#[test]
fn test_from_dir_loads_nested_templates() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("base.html"), "<p>{% block body %}{% endblock body %}</p>").unwrap();
    fs::create_dir_all(dir.path().join("pages")).unwrap();
    fs::write(
        dir.path().join("pages").join("hello.html"),
        "{% extends \"base.html\" %}{% block body %}Hello {{ name }}{% endblock body %}",
    )
    .unwrap();

    let engine = TemplateEngine::from_dir(dir.path()).unwrap();
    let mut context = TeraContext::new();
    context.insert("name", "world");

    assert_eq!(engine.render("pages/hello.html", &context).unwrap(), "<p>Hello world</p>");
}

#[test]
fn test_from_dir_missing_directory() {
    let result = TemplateEngine::from_dir(Path::new("/definitely/not/here"));
    assert!(matches!(result, Err(ViewError::NotFound(_))));
}

#[test]
fn test_filter_registered() {
    let dir = TempDir::new().unwrap();
    fs::write(
        dir.path().join("t.html"),
        "{{ text | truncate_words(num_words=2) }}",
    )
    .unwrap();

    let engine = TemplateEngine::from_dir(dir.path()).unwrap();
    let mut context = TeraContext::new();
    context.insert("text", "alpha beta gamma");

    assert_eq!(engine.render("t.html", &context).unwrap(), "alpha beta...");
}
