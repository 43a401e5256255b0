//! Shared fixture: a shop with cheap password hashing and helpers to mint
//! principals and stock the catalog.

use chrono::Duration;
use metal_factory::shop::SignupRequest;
use metal_factory::{
    InMemoryModelStore, NewProduct, PasswordHasher, Principal, ProductId, Role, Shop, TokenSigner,
};

pub const PASSWORD: &str = "correct-horse";

pub struct World {
    pub shop: Shop<InMemoryModelStore>,
    admin: Principal,
}

impl World {
    pub fn new() -> Self {
        let signer = TokenSigner::new("integration-secret", Duration::hours(1)).unwrap();
        let shop = Shop::new(InMemoryModelStore::new(), signer).with_hasher(PasswordHasher::with_cost(8, 1).unwrap());
        let mut world = Self {
            shop,
            admin: Principal {
                user_id: "bootstrap".into(),
                role: Role::Admin,
                username: "bootstrap".into(),
            },
        };
        world.admin = world.user("admin", Role::Admin);
        world
    }

    /// Sign up `name@example.com` with `role` and authenticate the returned token.
    pub fn user(&self, name: &str, role: Role) -> Principal {
        let auth = self
            .shop
            .signup(SignupRequest {
                username: name.into(),
                email: format!("{}@example.com", name),
                password: PASSWORD.into(),
                role: role.to_string(),
            })
            .unwrap();
        self.shop
            .authenticate(Some(&format!("Bearer {}", auth.token)))
            .unwrap()
    }

    pub fn admin(&self) -> &Principal {
        &self.admin
    }

    pub fn product(&self, name: &str, price: u64, stock: u32) -> ProductId {
        self.shop
            .create_product(
                &self.admin,
                NewProduct {
                    name: name.into(),
                    price,
                    stock,
                    category: "Steel".into(),
                    ..NewProduct::default()
                },
            )
            .unwrap()
            .id
    }

    pub fn stock(&self, id: &ProductId) -> u32 {
        self.shop.product(id).unwrap().stock
    }
}
