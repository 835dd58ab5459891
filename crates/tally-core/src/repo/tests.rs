//! Repository contract tests
//!
//! The `*_contract` functions are shared with the SQLite tests in
//! `db::tests` so both implementations are held to the same behavior.

use chrono::{Duration, TimeZone};

use super::*;

fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
}

fn new_expense(
    amount: i64,
    category: Option<&ExpenseCategory>,
    user: Option<i64>,
    date: DateTime<Utc>,
) -> NewExpense {
    NewExpense {
        amount: Decimal::new(amount, 2),
        currency: Currency::Eur,
        description: Some(format!("expense {}", amount)),
        date: Some(date),
        category: category.cloned(),
        telegram_user_id: user,
    }
}

pub(crate) fn category_contract(repo: &dyn CategoryRepository) {
    let food = repo.add("Food & Dining").unwrap();
    let travel = repo.add("Travel").unwrap();
    assert_ne!(food.id, travel.id);

    assert!(matches!(
        repo.add("Food & Dining"),
        Err(Error::CategoryExists(_))
    ));

    assert_eq!(repo.get("Travel").unwrap(), travel);
    // Lookups are exact and case-sensitive
    assert!(matches!(repo.get("travel"), Err(Error::CategoryNotFound(_))));

    let first = repo.get_or_create("Housing").unwrap();
    let second = repo.get_or_create("Housing").unwrap();
    assert_eq!(first, second);
    assert_eq!(repo.list().unwrap().len(), 3);

    let renamed = ExpenseCategory {
        id: travel.id,
        name: "Trips".to_string(),
    };
    repo.update(&renamed).unwrap();
    assert_eq!(repo.get("Trips").unwrap().id, travel.id);

    let missing = ExpenseCategory {
        id: 9999,
        name: "Ghost".to_string(),
    };
    assert!(matches!(
        repo.update(&missing),
        Err(Error::CategoryNotFound(_))
    ));

    let names: Vec<String> = repo.list().unwrap().into_iter().map(|c| c.name).collect();
    assert_eq!(names, vec!["Food & Dining", "Housing", "Trips"]);

    repo.delete("Housing").unwrap();
    assert!(repo.delete("Housing").unwrap_err().is_not_found());
    assert_eq!(repo.list().unwrap().len(), 2);
}

pub(crate) fn expense_contract(categories: &dyn CategoryRepository, repo: &dyn ExpenseRepository) {
    let food = categories.get_or_create("Food & Dining").unwrap();
    let travel = categories.get_or_create("Travel").unwrap();

    let lunch = repo
        .add(new_expense(1250, Some(&food), Some(1), at(2024, 3, 10)))
        .unwrap();
    let hotel = repo
        .add(new_expense(30000, Some(&travel), Some(1), at(2024, 3, 20)))
        .unwrap();
    let dinner = repo
        .add(new_expense(4000, Some(&food), Some(2), at(2024, 4, 1)))
        .unwrap();
    assert!(lunch.id < hotel.id && hotel.id < dinner.id);

    let fetched = repo.get(lunch.id).unwrap();
    assert_eq!(fetched.amount, Decimal::new(1250, 2));
    assert_eq!(fetched.currency, Currency::Eur);
    assert_eq!(fetched.category_name(), Some("Food & Dining"));
    assert_eq!(fetched.date, at(2024, 3, 10));

    assert_eq!(repo.list().unwrap().len(), 3);

    // Inclusive on both ends
    let march = repo
        .search_by_dates(at(2024, 3, 10), at(2024, 3, 20))
        .unwrap();
    assert_eq!(march.len(), 2);
    assert!(repo
        .search_by_dates(at(2020, 1, 1), at(2020, 12, 31))
        .unwrap()
        .is_empty());

    let food_expenses = repo.search_by_category(&food).unwrap();
    let mut ids: Vec<i64> = food_expenses.iter().map(|e| e.id).collect();
    ids.sort();
    assert_eq!(ids, vec![lunch.id, dinner.id]);

    let user_one = repo.list_by_user(1).unwrap();
    assert_eq!(
        user_one.iter().map(|e| e.id).collect::<Vec<_>>(),
        vec![hotel.id, lunch.id]
    );
    assert!(repo.list_by_user(404).unwrap().is_empty());

    let mut changed = fetched.clone();
    changed.amount = Decimal::new(999, 2);
    changed.currency = Currency::Usd;
    changed.category = Some(travel.clone());
    repo.update(&changed).unwrap();
    let updated = repo.get(lunch.id).unwrap();
    assert_eq!(updated.amount, Decimal::new(999, 2));
    assert_eq!(updated.currency, Currency::Usd);
    assert_eq!(updated.category_name(), Some("Travel"));
    assert!(updated.updated_at >= fetched.updated_at);

    let mut ghost = updated.clone();
    ghost.id = 9999;
    assert!(matches!(repo.update(&ghost), Err(Error::ExpenseNotFound(9999))));

    repo.delete(dinner.id).unwrap();
    assert!(matches!(
        repo.delete(dinner.id),
        Err(Error::ExpenseNotFound(_))
    ));
    assert!(matches!(repo.get(dinner.id), Err(Error::ExpenseNotFound(_))));
    // Still not found on a second attempt
    assert!(matches!(
        repo.delete(dinner.id),
        Err(Error::ExpenseNotFound(_))
    ));
}

pub(crate) fn totals_contract(categories: &dyn CategoryRepository, repo: &dyn ExpenseRepository) {
    let food = categories.get_or_create("Food & Dining").unwrap();
    let travel = categories.get_or_create("Travel").unwrap();
    let now = Utc::now();

    repo.add(new_expense(1000, Some(&food), Some(5), now)).unwrap();
    repo.add(new_expense(2500, Some(&food), Some(5), now)).unwrap();
    repo.add(new_expense(5000, Some(&travel), Some(5), now)).unwrap();
    repo.add(new_expense(700, None, Some(5), now)).unwrap();
    repo.add(new_expense(99900, Some(&travel), Some(6), now)).unwrap();

    let totals = repo.get_category_totals(5).unwrap();
    assert_eq!(
        totals,
        vec![
            CategoryTotal {
                category: "Travel".to_string(),
                total: Decimal::new(5000, 2)
            },
            CategoryTotal {
                category: "Food & Dining".to_string(),
                total: Decimal::new(3500, 2)
            },
            CategoryTotal {
                category: UNCATEGORIZED.to_string(),
                total: Decimal::new(700, 2)
            },
        ]
    );

    let monthly = repo.get_monthly_totals(5, 12).unwrap();
    assert_eq!(monthly.len(), 1);
    assert_eq!(monthly[0].month, now.format("%Y-%m").to_string());
    assert_eq!(monthly[0].total, Decimal::new(9200, 2));

    assert!(repo.get_category_totals(7).unwrap().is_empty());
    assert!(repo.get_monthly_totals(5, 0).unwrap().is_empty());
}

pub(crate) fn preference_contract(repo: &dyn UserPreferenceRepository) {
    assert!(repo.get_by_user_id(10).unwrap().is_none());

    let created = repo.upsert(10, Currency::Usd).unwrap();
    assert_eq!(created.telegram_user_id, 10);
    assert_eq!(created.preferred_currency, Currency::Usd);

    let updated = repo.upsert(10, Currency::Gbp).unwrap();
    assert_eq!(updated.id, created.id);
    assert_eq!(updated.preferred_currency, Currency::Gbp);
    assert!(updated.updated_at >= created.updated_at);

    let fetched = repo.get_by_user_id(10).unwrap().unwrap();
    assert_eq!(fetched.preferred_currency, Currency::Gbp);
    assert!(repo.get_by_user_id(11).unwrap().is_none());
}

#[test]
fn test_in_memory_categories() {
    category_contract(&InMemoryCategoryRepo::new());
}

#[test]
fn test_in_memory_expenses() {
    expense_contract(&InMemoryCategoryRepo::new(), &InMemoryExpenseRepo::new());
}

#[test]
fn test_in_memory_totals() {
    totals_contract(&InMemoryCategoryRepo::new(), &InMemoryExpenseRepo::new());
}

#[test]
fn test_in_memory_preferences() {
    preference_contract(&InMemoryUserPreferenceRepo::new());
}

fn dated(amount: i64, date: DateTime<Utc>) -> Expense {
    Expense {
        id: amount,
        amount: Decimal::new(amount, 0),
        currency: Currency::Eur,
        description: None,
        date,
        created_at: date,
        updated_at: date,
        category: None,
        telegram_user_id: Some(1),
    }
}

#[test]
fn test_monthly_totals_window_is_month_aligned() {
    let today = NaiveDate::from_ymd_opt(2024, 3, 15).unwrap();
    let expenses = vec![
        dated(1, at(2023, 12, 31)),
        dated(2, at(2024, 1, 1)),
        dated(3, at(2024, 1, 20)),
        dated(4, at(2024, 3, 1)),
    ];

    let totals = monthly_totals(&expenses, 3, today);
    assert_eq!(
        totals,
        vec![
            MonthlyTotal {
                month: "2024-01".to_string(),
                total: Decimal::new(5, 0)
            },
            MonthlyTotal {
                month: "2024-03".to_string(),
                total: Decimal::new(4, 0)
            },
        ]
    );

    let one_month = monthly_totals(&expenses, 1, today);
    assert_eq!(one_month.len(), 1);
    assert_eq!(one_month[0].month, "2024-03");
}

#[test]
fn test_first_month_crosses_year_boundary() {
    let today = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
    assert_eq!(
        first_month(today, 12),
        NaiveDate::from_ymd_opt(2023, 3, 1).unwrap()
    );
    assert_eq!(
        first_month(today, 2),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
    );
}

#[test]
fn test_monthly_totals_huge_window_keeps_everything() {
    let today = NaiveDate::from_ymd_opt(2024, 6, 15).unwrap();
    let expenses = vec![dated(7, at(2024, 6, 15)), dated(3, at(1999, 1, 2))];

    for months in [u32::MAX, 1u32 << 31] {
        let totals = monthly_totals(&expenses, months, today);
        let months_seen: Vec<&str> = totals.iter().map(|t| t.month.as_str()).collect();
        assert_eq!(months_seen, vec!["1999-01", "2024-06"]);
    }
    assert_eq!(first_month(today, u32::MAX), NaiveDate::MIN);
}

#[test]
fn test_category_totals_tie_breaks_by_name() {
    let now = Utc::now() - Duration::days(1);
    let mut a = dated(10, now);
    a.category = Some(ExpenseCategory {
        id: 1,
        name: "Zoo".to_string(),
    });
    let mut b = dated(10, now);
    b.category = Some(ExpenseCategory {
        id: 2,
        name: "Art".to_string(),
    });

    let totals = category_totals(&[a, b]);
    assert_eq!(totals[0].category, "Art");
    assert_eq!(totals[1].category, "Zoo");
}
