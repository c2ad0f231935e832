mod common;

use assert_matches::assert_matches;
use common::TestApp;
use foodcart_api::{
    errors::ServiceError,
    services::reviews::{NewReview, ReviewPatch},
};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn review(rating: i32, comment: &str) -> NewReview {
    NewReview {
        rating,
        comment: comment.to_string(),
    }
}

#[tokio::test]
async fn meal_without_reviews_has_zero_rating() {
    let app = TestApp::new().await;
    let meal = app.create_meal("Plain Rice", dec!(3.50)).await;

    assert_eq!(meal.average_rating, Decimal::ZERO);
    assert_eq!(meal.review_count, 0);
    assert!(meal.reviews.is_empty());
}

#[tokio::test]
async fn second_reviewer_moves_the_average() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let meal = app.create_meal("Margherita", dec!(9.99)).await;

    let after_first = reviews
        .add_review(meal.id, app.alice.id, review(5, "Perfect"))
        .await
        .expect("first review");
    assert_eq!(after_first.average_rating, dec!(5.0));
    assert_eq!(after_first.review_count, 1);
    assert_eq!(after_first.reviews[0].username, "alice");
    assert_eq!(after_first.reviews[0].user, app.alice.id);

    let after_second = reviews
        .add_review(meal.id, app.bob.id, review(3, "Too salty"))
        .await
        .expect("second review");
    assert_eq!(after_second.average_rating, dec!(4.0));
    assert_eq!(after_second.review_count, 2);
    let authors: Vec<&str> = after_second
        .reviews
        .iter()
        .map(|r| r.username.as_str())
        .collect();
    assert_eq!(authors, vec!["alice", "bob"]);
}

#[tokio::test]
async fn average_rounds_half_up_to_one_decimal() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let meal = app.create_meal("Pad Thai", dec!(12.00)).await;

    let reviewers = [
        (app.admin.id, 5),
        (app.alice.id, 4),
        (app.bob.id, 4),
        (app.carol.id, 4),
    ];
    let mut last = None;
    for (user_id, rating) in reviewers {
        last = Some(
            reviews
                .add_review(meal.id, user_id, review(rating, "ok"))
                .await
                .expect("add review"),
        );
    }

    // 17 / 4 = 4.25
    let meal = last.expect("at least one review");
    assert_eq!(meal.average_rating, dec!(4.3));
    assert_eq!(meal.review_count, 4);
}

#[tokio::test]
async fn duplicate_review_is_rejected_and_leaves_reviews_unchanged() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let meal = app.create_meal("Ramen", dec!(14.25)).await;

    reviews
        .add_review(meal.id, app.alice.id, review(4, "Rich broth"))
        .await
        .expect("first review");

    let result = reviews
        .add_review(meal.id, app.alice.id, review(1, "Changed my mind"))
        .await;
    assert_matches!(result, Err(ServiceError::DuplicateReview(_)));

    let meal = app.services().meals.get_meal(meal.id).await.unwrap();
    assert_eq!(meal.review_count, 1);
    assert_eq!(meal.reviews[0].rating, 4);
    assert_eq!(meal.reviews[0].comment, "Rich broth");
}

#[tokio::test]
async fn review_of_missing_meal_is_not_found() {
    let app = TestApp::new().await;
    let result = app
        .services()
        .reviews
        .add_review(9_999, app.alice.id, review(5, "Ghost food"))
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn invalid_review_input_is_rejected() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let meal = app.create_meal("Falafel", dec!(7.00)).await;

    assert_matches!(
        reviews.add_review(meal.id, app.alice.id, review(6, "Off the charts")).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        reviews.add_review(meal.id, app.alice.id, review(3, "   ")).await,
        Err(ServiceError::ValidationError(_))
    );

    let meal = app.services().meals.get_meal(meal.id).await.unwrap();
    assert_eq!(meal.review_count, 0);
}

#[tokio::test]
async fn owner_updates_review_and_aggregate_follows() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let meal = app.create_meal("Burrito", dec!(8.75)).await;

    let added = reviews
        .add_review(meal.id, app.alice.id, review(2, "Cold"))
        .await
        .unwrap();
    let review_id = added.reviews[0].id;

    let updated = reviews
        .update_review(
            meal.id,
            review_id,
            app.alice.id,
            ReviewPatch {
                rating: Some(5),
                comment: None,
            },
        )
        .await
        .expect("owner update");

    assert_eq!(updated.average_rating, dec!(5.0));
    assert_eq!(updated.reviews[0].rating, 5);
    assert_eq!(updated.reviews[0].comment, "Cold");
}

#[tokio::test]
async fn non_owner_cannot_touch_a_review() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let meal = app.create_meal("Sushi Set", dec!(22.00)).await;

    let added = reviews
        .add_review(meal.id, app.alice.id, review(5, "Fresh"))
        .await
        .unwrap();
    let review_id = added.reviews[0].id;

    let update = reviews
        .update_review(
            meal.id,
            review_id,
            app.bob.id,
            ReviewPatch {
                rating: Some(1),
                ..Default::default()
            },
        )
        .await;
    assert_matches!(update, Err(ServiceError::NotFound(_)));

    let delete = reviews.delete_review(meal.id, review_id, app.bob.id).await;
    assert_matches!(delete, Err(ServiceError::NotFound(_)));

    let meal = app.services().meals.get_meal(meal.id).await.unwrap();
    assert_eq!(meal.reviews[0].rating, 5);
    assert_eq!(meal.review_count, 1);
}

#[tokio::test]
async fn review_is_scoped_to_its_meal() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let soup = app.create_meal("Soup", dec!(4.00)).await;
    let salad = app.create_meal("Salad", dec!(5.00)).await;

    let added = reviews
        .add_review(soup.id, app.alice.id, review(4, "Warm"))
        .await
        .unwrap();

    let result = reviews
        .delete_review(salad.id, added.reviews[0].id, app.alice.id)
        .await;
    assert_matches!(result, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn owner_deletes_review_and_can_review_again() {
    let app = TestApp::new().await;
    let reviews = &app.services().reviews;
    let meal = app.create_meal("Pho", dec!(11.40)).await;

    reviews
        .add_review(meal.id, app.bob.id, review(3, "Fine"))
        .await
        .unwrap();
    let added = reviews
        .add_review(meal.id, app.alice.id, review(5, "Great"))
        .await
        .unwrap();
    let alice_review = added
        .reviews
        .iter()
        .find(|r| r.user == app.alice.id)
        .expect("alice's review")
        .id;

    let after_delete = reviews
        .delete_review(meal.id, alice_review, app.alice.id)
        .await
        .expect("owner delete");
    assert_eq!(after_delete.review_count, 1);
    assert_eq!(after_delete.average_rating, dec!(3.0));

    let again = reviews
        .add_review(meal.id, app.alice.id, review(4, "Still good"))
        .await
        .expect("review after delete");
    assert_eq!(again.review_count, 2);
    assert_eq!(again.average_rating, dec!(3.5));
}
