use metal_factory::{CartItem, ProductId, Role, ShopError};

use crate::support::World;

#[test]
fn empty_cart_before_first_save() {
    let world = World::new();
    let ivy = world.user("ivy", Role::Customer);
    let cart = world.shop.cart(&ivy).unwrap();
    assert!(cart.items.is_empty());
    assert_eq!(cart.total, 0);
}

#[test]
fn replace_then_get_returns_submitted_items() {
    let world = World::new();
    let ivy = world.user("ivy", Role::Customer);
    let a = world.product("Plate", 500, 10);
    let b = world.product("Rod", 120, 10);

    let submitted = vec![CartItem::new(b.clone(), 4), CartItem::new(a.clone(), 1)];
    world.shop.replace_cart(&ivy, submitted.clone()).unwrap();

    let cart = world.shop.cart(&ivy).unwrap();
    let got: Vec<CartItem> = cart
        .items
        .iter()
        .map(|l| CartItem::new(l.product_id.clone(), l.quantity))
        .collect();
    assert_eq!(got, submitted);
    assert_eq!(cart.total, 4 * 120 + 500);
    assert_eq!(cart.items[0].name.as_deref(), Some("Rod"));
}

#[test]
fn replace_rejects_unknown_products_and_zero_quantity() {
    let world = World::new();
    let ivy = world.user("ivy", Role::Customer);
    let a = world.product("Plate", 500, 10);

    assert!(matches!(
        world.shop.replace_cart(&ivy, vec![CartItem::new("ghost", 1)]),
        Err(ShopError::Validation(_))
    ));
    assert!(matches!(
        world.shop.replace_cart(&ivy, vec![CartItem::new(a, 0)]),
        Err(ShopError::Validation(_))
    ));
}

#[test]
fn item_operations() {
    let world = World::new();
    let ivy = world.user("ivy", Role::Customer);
    let a = world.product("Plate", 500, 10);

    world.shop.add_to_cart(&ivy, a.clone(), 1).unwrap();
    let cart = world.shop.add_to_cart(&ivy, a.clone(), 2).unwrap();
    assert_eq!(cart.items.len(), 1);
    assert_eq!(cart.items[0].quantity, 3);

    let cart = world.shop.update_cart_item(&ivy, &a, 7).unwrap();
    assert_eq!(cart.items[0].quantity, 7);
    assert!(matches!(
        world.shop.update_cart_item(&ivy, &a, 0),
        Err(ShopError::Validation(_))
    ));
    assert!(matches!(
        world.shop.update_cart_item(&ivy, &ProductId::from("other"), 1),
        Err(ShopError::NotFound { .. })
    ));

    world.shop.remove_cart_item(&ivy, &a).unwrap();
    let cart = world.shop.remove_cart_item(&ivy, &a).unwrap();
    assert!(cart.items.is_empty());

    assert!(matches!(
        world.shop.add_to_cart(&ivy, ProductId::from("ghost"), 1),
        Err(ShopError::NotFound { .. })
    ));
}

#[test]
fn carts_are_customer_only_and_private() {
    let world = World::new();
    let ivy = world.user("ivy", Role::Customer);
    let jon = world.user("jon", Role::Customer);
    let seller = world.user("sam", Role::Seller);
    let a = world.product("Plate", 500, 10);

    world.shop.add_to_cart(&ivy, a, 2).unwrap();
    assert!(world.shop.cart(&jon).unwrap().items.is_empty());
    assert!(matches!(world.shop.cart(&seller), Err(ShopError::Forbidden(_))));
}

#[test]
fn deleted_product_shows_as_unavailable() {
    let world = World::new();
    let ivy = world.user("ivy", Role::Customer);
    let a = world.product("Plate", 500, 10);
    world.shop.add_to_cart(&ivy, a.clone(), 2).unwrap();

    world.shop.delete_product(world.admin(), &a).unwrap();

    let cart = world.shop.cart(&ivy).unwrap();
    assert!(!cart.items[0].available);
    assert_eq!(cart.total, 0);
}
