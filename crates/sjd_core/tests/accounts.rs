use sjd_core::db::open_db_in_memory;
use sjd_core::model::user::Role;
use sjd_core::repo::user_repo::{SqliteUserRepository, UserRepository};
use sjd_core::service::account_service::{AccountError, AccountService, RegisterRequest};

fn request(email: &str, role: Role) -> RegisterRequest {
    RegisterRequest {
        email: email.to_string(),
        cpf: "123.456.789-01".to_string(),
        phone: Some(" (61) 99999-0000 ".to_string()),
        full_name: " Maria Souza ".to_string(),
        password: "segredo123".to_string(),
        role,
    }
}

#[test]
fn register_normalizes_fields_and_hashes_password() {
    let conn = open_db_in_memory().unwrap();
    let service = AccountService::new(SqliteUserRepository::try_new(&conn).unwrap());

    let landing = service
        .register(request("Maria@Example.com", Role::Judge))
        .unwrap();

    assert_eq!(landing.home_route, "/home-juiz");
    assert_eq!(landing.profile.email, "maria@example.com");
    assert_eq!(landing.profile.cpf, "12345678901");
    assert_eq!(landing.profile.phone.as_deref(), Some("(61) 99999-0000"));
    assert_eq!(landing.profile.full_name, "Maria Souza");

    let stored_hash: String = conn
        .query_row(
            "SELECT password_hash FROM users WHERE id = ?1;",
            [landing.profile.id],
            |row| row.get(0),
        )
        .unwrap();
    assert!(stored_hash.starts_with("$argon2"));
    assert!(!stored_hash.contains("segredo123"));
}

#[test]
fn duplicate_email_is_rejected_case_insensitively() {
    let conn = open_db_in_memory().unwrap();
    let service = AccountService::new(SqliteUserRepository::try_new(&conn).unwrap());
    service
        .register(request("ana@example.com", Role::Citizen))
        .unwrap();

    let err = service
        .register(request("ANA@example.com", Role::LegalEntity))
        .unwrap_err();
    assert!(matches!(err, AccountError::EmailTaken(email) if email == "ana@example.com"));
}

#[test]
fn register_rejects_invalid_input() {
    let conn = open_db_in_memory().unwrap();
    let service = AccountService::new(SqliteUserRepository::try_new(&conn).unwrap());

    assert!(matches!(
        service.register(request("not-an-email", Role::Citizen)),
        Err(AccountError::InvalidEmail(_))
    ));
    assert!(matches!(
        service.register(RegisterRequest {
            cpf: "123".to_string(),
            ..request("a@example.com", Role::Citizen)
        }),
        Err(AccountError::InvalidCpf(_))
    ));
    assert!(matches!(
        service.register(RegisterRequest {
            full_name: "  ".to_string(),
            ..request("a@example.com", Role::Citizen)
        }),
        Err(AccountError::InvalidName)
    ));
    assert!(matches!(
        service.register(RegisterRequest {
            password: "12345".to_string(),
            ..request("a@example.com", Role::Citizen)
        }),
        Err(AccountError::WeakPassword { min_chars: 6 })
    ));
}

#[test]
fn login_routes_each_role_to_its_home() {
    let conn = open_db_in_memory().unwrap();
    let service = AccountService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let cases = [
        ("cidadao@example.com", Role::Citizen, "/home-cidadao"),
        ("juiz@example.com", Role::Judge, "/home-juiz"),
        ("advogado@example.com", Role::LegalEntity, "/home-advogado"),
        ("servidor@example.com", Role::PublicServant, "/home-servidor"),
    ];
    for (email, role, _) in cases {
        service.register(request(email, role)).unwrap();
    }

    for (email, role, route) in cases {
        let landing = service.login(&email.to_uppercase(), "segredo123").unwrap();
        assert_eq!(landing.profile.role, role);
        assert_eq!(landing.home_route, route);
    }
}

#[test]
fn login_distinguishes_unknown_email_and_wrong_password() {
    let conn = open_db_in_memory().unwrap();
    let service = AccountService::new(SqliteUserRepository::try_new(&conn).unwrap());
    service
        .register(request("joao@example.com", Role::Citizen))
        .unwrap();

    assert!(matches!(
        service.login("ghost@example.com", "segredo123"),
        Err(AccountError::UnknownEmail(_))
    ));
    assert!(matches!(
        service.login("joao@example.com", "wrong-password"),
        Err(AccountError::WrongPassword)
    ));
}

#[test]
fn change_password_requires_the_current_password() {
    let conn = open_db_in_memory().unwrap();
    let service = AccountService::new(SqliteUserRepository::try_new(&conn).unwrap());
    let id = service
        .register(request("pedro@example.com", Role::PublicServant))
        .unwrap()
        .profile
        .id;

    assert!(matches!(
        service.change_password(id, "nope-nope", "novaSenha1"),
        Err(AccountError::WrongPassword)
    ));
    assert!(matches!(
        service.change_password(id, "segredo123", "abc"),
        Err(AccountError::WeakPassword { .. })
    ));

    service
        .change_password(id, "segredo123", "novaSenha1")
        .unwrap();
    assert!(service.login("pedro@example.com", "segredo123").is_err());
    assert_eq!(
        service
            .login("pedro@example.com", "novaSenha1")
            .unwrap()
            .profile
            .id,
        id
    );
}

#[test]
fn profile_and_unknown_user_lookups() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteUserRepository::try_new(&conn).unwrap();
    assert!(!repo.email_exists("x@example.com").unwrap());

    let service = AccountService::new(repo);
    let id = service
        .register(request("x@example.com", Role::LegalEntity))
        .unwrap()
        .profile
        .id;

    let profile = service.profile(id).unwrap();
    assert_eq!(profile.role, Role::LegalEntity);
    assert!(matches!(
        service.profile(id + 100),
        Err(AccountError::UserNotFound(_))
    ));
    assert!(matches!(
        service.change_password(id + 100, "a", "b"),
        Err(AccountError::UserNotFound(_))
    ));
}
