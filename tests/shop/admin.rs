use std::thread;
use std::time::Duration;

use metal_factory::model::{ModelError, Versioned};
use metal_factory::shop::{LoginRequest, SignupRequest};
use metal_factory::{
    InMemoryModelStore, Model, ModelStore, ModelsExt, PasswordHasher, Principal, Role, Shop,
    ShopError, TokenSigner, User,
};

use crate::support::{World, PASSWORD};

/// Store whose user writes stall, widening any read-modify-write window.
#[derive(Clone)]
struct SlowUserWrites {
    inner: InMemoryModelStore,
    delay: Duration,
}

impl SlowUserWrites {
    fn stall<M: Model>(&self) {
        if M::COLLECTION == User::COLLECTION {
            thread::sleep(self.delay);
        }
    }
}

impl ModelStore for SlowUserWrites {
    fn get_model<M: Model>(&self, id: &str) -> Result<Option<Versioned<M>>, ModelError> {
        self.inner.get_model(id)
    }

    fn save_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError> {
        self.stall::<M>();
        self.inner.save_model(model)
    }

    fn insert_model<M: Model>(&self, model: &M) -> Result<Versioned<M>, ModelError> {
        self.inner.insert_model(model)
    }

    fn update_model<M: Model>(&self, model: &M, expected_version: u64) -> Result<Versioned<M>, ModelError> {
        self.stall::<M>();
        self.inner.update_model(model, expected_version)
    }

    fn delete_model<M: Model>(&self, id: &str) -> Result<bool, ModelError> {
        self.inner.delete_model::<M>(id)
    }

    fn find_models<M: Model>(&self, predicate: &dyn Fn(&M) -> bool) -> Result<Vec<Versioned<M>>, ModelError> {
        self.inner.find_models(predicate)
    }
}

fn slow_shop() -> Shop<SlowUserWrites> {
    let signer = TokenSigner::new("integration-secret", chrono::Duration::hours(1)).unwrap();
    let store = SlowUserWrites {
        inner: InMemoryModelStore::new(),
        delay: Duration::from_millis(100),
    };
    Shop::new(store, signer).with_hasher(PasswordHasher::with_cost(8, 1).unwrap())
}

fn enroll(shop: &Shop<SlowUserWrites>, name: &str, role: Role) -> (String, Principal) {
    let auth = shop
        .signup(SignupRequest {
            username: name.into(),
            email: format!("{}@example.com", name),
            password: PASSWORD.into(),
            role: role.to_string(),
        })
        .unwrap();
    let principal = shop
        .authenticate(Some(&format!("Bearer {}", auth.token)))
        .unwrap();
    (auth.token, principal)
}

#[test]
fn only_admins_manage_users() {
    let world = World::new();
    let sup = world.user("sup", Role::Supervisor);
    assert!(matches!(world.shop.list_users(&sup), Err(ShopError::Forbidden(_))));

    let users = world.shop.list_users(world.admin()).unwrap();
    assert_eq!(users.len(), 2);
}

#[test]
fn role_change_applies_to_existing_tokens() {
    let world = World::new();
    let frank = world.user("frank", Role::Customer);

    world
        .shop
        .set_user_role(world.admin(), &frank.user_id, Role::Supervisor)
        .unwrap();

    // The principal was resolved before the change; a stale principal keeps
    // its role, but a fresh authentication sees the new one.
    assert!(world.shop.all_orders(&frank).is_err());
    let users = world.shop.list_users(world.admin()).unwrap();
    let stored = users.iter().find(|u| u.id == frank.user_id).unwrap();
    assert_eq!(stored.role, Role::Supervisor);
}

#[test]
fn deleted_user_cannot_authenticate() {
    let world = World::new();
    world.user("gina", Role::Customer);
    let auth = world
        .shop
        .login(LoginRequest {
            email: "gina@example.com".into(),
            password: PASSWORD.into(),
            role: "Customer".into(),
        })
        .unwrap();

    world.shop.delete_user(world.admin(), &auth.user.id).unwrap();

    assert!(matches!(
        world.shop.authenticate(Some(&format!("Bearer {}", auth.token))),
        Err(ShopError::Unauthenticated(_))
    ));
    assert!(matches!(
        world.shop.delete_user(world.admin(), &auth.user.id),
        Err(ShopError::NotFound { .. })
    ));
}

#[test]
fn reset_password_enforces_minimum_length() {
    let world = World::new();
    let hank = world.user("hank", Role::Seller);

    assert!(matches!(
        world.shop.reset_password(world.admin(), &hank.user_id, "short"),
        Err(ShopError::Validation(_))
    ));
    world
        .shop
        .reset_password(world.admin(), &hank.user_id, "a-much-longer-one")
        .unwrap();
    assert!(world
        .shop
        .login(LoginRequest {
            email: "hank@example.com".into(),
            password: "a-much-longer-one".into(),
            role: "Seller".into(),
        })
        .is_ok());
}

#[test]
fn seed_admin_is_idempotent() {
    let world = World::new();
    let first = world.shop.seed_admin("root@example.com", "root-password").unwrap();
    assert_eq!(first.map(|u| u.role), Some(Role::Admin));
    assert!(world
        .shop
        .seed_admin("ROOT@example.com", "root-password")
        .unwrap()
        .is_none());
}

#[test]
fn rename_racing_delete_never_resurrects_the_user() {
    let shop = slow_shop();
    let (_, admin) = enroll(&shop, "root", Role::Admin);
    let (token, ivan) = enroll(&shop, "ivan", Role::Customer);

    thread::scope(|s| {
        let rename = s.spawn(|| shop.update_username(&ivan, "renamed"));
        thread::sleep(Duration::from_millis(20));
        let delete = s.spawn(|| shop.delete_user(&admin, &ivan.user_id));

        let renamed = rename.join().unwrap();
        assert!(matches!(renamed, Ok(_) | Err(ShopError::NotFound { .. })), "{renamed:?}");
        delete.join().unwrap().unwrap();
    });

    assert!(shop
        .store()
        .models::<User>()
        .get(ivan.user_id.as_str())
        .unwrap()
        .is_none());
    assert!(matches!(
        shop.authenticate(Some(&format!("Bearer {}", token))),
        Err(ShopError::Unauthenticated(_))
    ));
}

#[test]
fn rename_racing_password_reset_keeps_the_reset() {
    let shop = slow_shop();
    let (_, admin) = enroll(&shop, "root", Role::Admin);
    let (token, judy) = enroll(&shop, "judy", Role::Seller);

    thread::scope(|s| {
        let reset = s.spawn(|| shop.reset_password(&admin, &judy.user_id, "a-fresh-password"));
        thread::sleep(Duration::from_millis(20));
        let rename = s.spawn(|| shop.update_username(&judy, "renamed"));

        reset.join().unwrap().unwrap();
        assert_eq!(rename.join().unwrap().unwrap().username, "renamed");
    });

    assert!(matches!(
        shop.authenticate(Some(&format!("Bearer {}", token))),
        Err(ShopError::Unauthenticated(_))
    ));
    let login = shop
        .login(LoginRequest {
            email: "judy@example.com".into(),
            password: "a-fresh-password".into(),
            role: "Seller".into(),
        })
        .unwrap();
    assert_eq!(login.user.username, "renamed");
}
