//! Persistence integration tests

use sous::db::{self, SaveOutcome, SavedRecipeRepo, SavedTimerRepo};

mod common;
use common::{make_steps, setup_test_db};

#[test]
fn saving_twice_stores_exactly_one_entry() {
    let repo = SavedRecipeRepo::new(setup_test_db());
    let steps = make_steps(&["재료를 씻으세요", "끓는 물에 넣으세요"]);

    assert_eq!(
        repo.save("kimchi-jjigae", "김치찌개", &steps).unwrap(),
        SaveOutcome::Saved
    );
    assert_eq!(
        repo.save("kimchi-jjigae", "김치찌개", &steps).unwrap(),
        SaveOutcome::AlreadySaved
    );

    let saved = repo.list().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].title, "김치찌개");
    assert_eq!(saved[0].steps.len(), 2);
}

#[test]
fn timer_presets_seed_once_with_defaults() {
    let repo = SavedTimerRepo::new(setup_test_db());

    let timers = repo.list().unwrap();
    let labels: Vec<&str> = timers.iter().map(|t| t.label.as_str()).collect();
    assert_eq!(labels, ["라면", "계란 삶기", "파스타 면"]);
    assert_eq!(timers[1].seconds, 360);

    // Presets survive mutation without re-seeding
    repo.delete(&timers[0].id).unwrap();
    repo.add("찜닭", 1500).unwrap();
    let after = repo.list().unwrap();
    assert_eq!(after.len(), 3);
    assert!(after.iter().all(|t| t.label != "라면"));
}

#[test]
fn database_persists_across_reopen() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("sous.db");

    {
        let repo = SavedRecipeRepo::new(db::init(&path).unwrap());
        repo.save("bibimbap", "비빔밥", &make_steps(&["밥을 지으세요"]))
            .unwrap();
    }

    let repo = SavedRecipeRepo::new(db::init(&path).unwrap());
    let saved = repo.list().unwrap();
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].id, "bibimbap");
}

#[test]
fn recipes_and_timers_do_not_interfere() {
    let pool = setup_test_db();
    let recipes = SavedRecipeRepo::new(pool.clone());
    let timers = SavedTimerRepo::new(pool);

    recipes
        .save("bibimbap", "비빔밥", &make_steps(&["밥을 지으세요"]))
        .unwrap();
    assert_eq!(timers.list().unwrap().len(), 3);
    assert_eq!(recipes.list().unwrap().len(), 1);
}
