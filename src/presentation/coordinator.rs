//
// Copyright (c) 2024 Nathan Fiedler
//
use super::debounce::Debouncer;
use super::gate::{GatedRepository, WriteGate};
use crate::domain::entities::{Outcome, User, UserFilter};
use crate::domain::repositories::{UserFeed, UserRepository};
use crate::domain::usecases::{add_user, remove_user, update_user, UseCase};
use crate::domain::validation::ValidationStrategy;
use crate::settings::Settings;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// State of the user list as shown to the presentation layer.
pub type UserListState = Outcome<Vec<User>>;

///
/// Holds the user list, search, and filter state for a presentation layer.
///
/// The list state starts out `Loading` and follows the repository's record
/// set from then on. Search queries take effect after a quiet period,
/// replacing the current subscription. Adds, updates, and deletes are
/// validated, run one at a time, and any failure is reported as an `Error`
/// state with a user-facing message.
///
/// A filtered view is kept alongside the list state, derived from the most
/// recent successful list and the current `UserFilter`.
///
/// Must be created and used from within a Tokio runtime.
///
pub struct UserListCoordinator {
    inner: Arc<Inner>,
    search: Debouncer<String>,
}

struct Inner {
    repository: Arc<dyn UserRepository>,
    validator: Arc<dyn ValidationStrategy>,
    operation_timeout: Duration,
    state: watch::Sender<UserListState>,
    filtered: watch::Sender<Vec<User>>,
    view: Mutex<ViewState>,
    // add, update, and delete run one at a time
    operations: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Default)]
struct ViewState {
    // bumped for every subscription, stale feeds compare unequal
    generation: u64,
    users: Vec<User>,
    filter: UserFilter,
    query: String,
    subscription: Option<JoinHandle<()>>,
}

impl UserListCoordinator {
    /// Begin following the full list of users.
    pub fn start(
        repository: Arc<dyn UserRepository>,
        validator: Arc<dyn ValidationStrategy>,
        settings: &Settings,
    ) -> Self {
        let (state, _) = watch::channel(Outcome::Loading);
        let (filtered, _) = watch::channel(Vec::new());
        let inner = Arc::new(Inner {
            repository,
            validator,
            operation_timeout: settings.operation_timeout,
            state,
            filtered,
            view: Mutex::new(ViewState::default()),
            operations: Arc::new(tokio::sync::Mutex::new(())),
        });
        let searcher = Arc::downgrade(&inner);
        let search = Debouncer::new(settings.search_debounce, move |query: String| {
            if let Some(inner) = searcher.upgrade() {
                inner.run_search(&query);
            }
        });
        inner.subscribe(inner.repository.all_users());
        Self { inner, search }
    }

    /// Receiver for the list state.
    pub fn state(&self) -> watch::Receiver<UserListState> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the list state.
    pub fn current_state(&self) -> UserListState {
        self.inner.state.borrow().clone()
    }

    /// Receiver for the filtered view of the last successful list.
    pub fn filtered_users(&self) -> watch::Receiver<Vec<User>> {
        self.inner.filtered.subscribe()
    }

    /// The most recently requested search query, empty after a refresh.
    pub fn search_query(&self) -> String {
        self.inner.lock_view().query.clone()
    }

    /// The filter currently applied to the filtered view.
    pub fn filter(&self) -> UserFilter {
        self.inner.lock_view().filter.clone()
    }

    ///
    /// Request a new search. The query takes effect once no other query has
    /// been requested for the debounce period; a blank query shows every
    /// user.
    ///
    pub fn set_search_query<S: Into<String>>(&self, query: S) {
        let query = query.into();
        self.inner.lock_view().query = query.clone();
        self.search.call(query);
    }

    /// Drop any search, pending or applied, and follow the full list again.
    pub fn refresh(&self) {
        self.search.cancel();
        self.inner.lock_view().query.clear();
        self.inner.subscribe(self.inner.repository.all_users());
    }

    /// Validate and add a new user, returning it with its new identifier.
    pub async fn add_user(&self, user: User) -> Outcome<User> {
        self.perform("add user", move |records, validator| {
            add_user::AddUser::new(records, validator).call(add_user::Params { user })
        })
        .await
    }

    /// Validate and replace the stored user with the same identifier.
    pub async fn update_user(&self, user: User) -> Outcome<User> {
        self.perform("update user", move |records, validator| {
            update_user::UpdateUser::new(records, validator).call(update_user::Params { user })
        })
        .await
    }

    /// Remove the user with the given identifier.
    pub async fn delete_user(&self, user_id: i64) -> Outcome<()> {
        self.perform("delete user", move |records, _| {
            remove_user::RemoveUser::new(records).call(remove_user::Params { user_id })
        })
        .await
    }

    ///
    /// Narrow the filtered view to users whose first name starts with the
    /// given value, ignoring case and surrounding whitespace. `None` removes
    /// the first name criterion.
    ///
    pub fn set_first_name_filter(&self, first_name: Option<String>) {
        let mut view = self.inner.lock_view();
        view.filter.first_name = first_name;
        self.inner.refilter(&view);
    }

    /// Replace every criterion of the filtered view.
    pub fn set_filter(&self, filter: UserFilter) {
        let mut view = self.inner.lock_view();
        view.filter = filter;
        self.inner.refilter(&view);
    }

    /// Show the last successful list unfiltered.
    pub fn clear_filters(&self) {
        self.set_filter(UserFilter::default());
    }

    // Run a job on the blocking pool, one job at a time, and turn its result
    // into an outcome. Success reloads the full list, failure becomes the
    // list state. A job that overruns the timeout is abandoned, unless it has
    // already begun writing, in which case its actual result is awaited.
    async fn perform<T, F>(&self, name: &'static str, job: F) -> Outcome<T>
    where
        T: Send + 'static,
        F: FnOnce(Arc<dyn UserRepository>, Arc<dyn ValidationStrategy>) -> anyhow::Result<T>
            + Send
            + 'static,
    {
        // owned by the job so that an abandoned job still holds off the next
        let serial = Arc::clone(&self.inner.operations).lock_owned().await;
        let gate = Arc::new(WriteGate::default());
        let records: Arc<dyn UserRepository> = Arc::new(GatedRepository::new(
            Arc::clone(&self.inner.repository),
            Arc::clone(&gate),
        ));
        let validator = Arc::clone(&self.inner.validator);
        let mut task = tokio::task::spawn_blocking(move || {
            let _serial = serial;
            job(records, validator)
        });
        let joined = match tokio::time::timeout(self.inner.operation_timeout, &mut task).await {
            Ok(joined) => joined,
            Err(_) if gate.abandon() => Ok(Err(crate::Error::TimedOut.into())),
            Err(_) => {
                debug!("{} overran its timeout while writing", name);
                task.await
            }
        };
        let result = joined
            .unwrap_or_else(|err| Err(crate::Error::InternalError(err.to_string()).into()));
        let outcome = Outcome::from(result);
        match &outcome {
            Outcome::Success(_) => {
                info!("{} succeeded", name);
                self.refresh();
            }
            Outcome::Error(message) => {
                warn!("{} failed: {}", name, message);
                self.inner.state.send_replace(Outcome::Error(message.clone()));
            }
            Outcome::Loading => (),
        }
        outcome
    }
}

impl Drop for UserListCoordinator {
    fn drop(&mut self) {
        self.search.cancel();
        if let Some(task) = self.inner.lock_view().subscription.take() {
            task.abort();
        }
    }
}

impl Inner {
    fn lock_view(&self) -> MutexGuard<'_, ViewState> {
        self.view.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn run_search(self: &Arc<Self>, query: &str) {
        let feed = if query.trim().is_empty() {
            self.repository.all_users()
        } else {
            self.repository.search_users(query)
        };
        self.subscribe(feed);
    }

    // Replace the current subscription with one following the given feed.
    fn subscribe(self: &Arc<Self>, mut feed: UserFeed) {
        let mut view = self.lock_view();
        view.generation += 1;
        let generation = view.generation;
        if let Some(task) = view.subscription.take() {
            task.abort();
        }
        debug!(
            "following users (query: {:?}, generation: {})",
            feed.query(),
            generation
        );
        self.state.send_replace(Outcome::Loading);
        let weak: Weak<Inner> = Arc::downgrade(self);
        view.subscription = Some(tokio::spawn(async move {
            loop {
                let users = feed.current();
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                if !inner.publish(generation, users) {
                    break;
                }
                drop(inner);
                if let Err(err) = feed.changed().await {
                    if let Some(inner) = weak.upgrade() {
                        inner.fail(generation, err.to_string());
                    }
                    break;
                }
            }
        }));
    }

    // Returns false if the subscription has been superseded.
    fn publish(&self, generation: u64, users: Vec<User>) -> bool {
        let mut view = self.lock_view();
        if view.generation != generation {
            return false;
        }
        view.users = users.clone();
        self.state.send_replace(Outcome::Success(users));
        self.refilter(&view);
        true
    }

    fn fail(&self, generation: u64, message: String) {
        let view = self.lock_view();
        if view.generation == generation {
            warn!("user list failed: {}", message);
            self.state.send_replace(Outcome::Error(message));
        }
    }

    fn refilter(&self, view: &ViewState) {
        self.filtered.send_replace(view.filter.apply(&view.users));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::repositories::UserRepositoryImpl;
    use crate::data::sources::{build_data_source, DataSourceType};
    use crate::domain::repositories::MockUserRepository;
    use crate::domain::validation::UserValidation;
    use chrono::NaiveDate;

    fn settings() -> Settings {
        Settings {
            search_debounce: Duration::from_millis(50),
            ..Default::default()
        }
    }

    fn validator() -> Arc<dyn ValidationStrategy> {
        Arc::new(UserValidation::with_today(
            NaiveDate::from_ymd_opt(2024, 6, 15).unwrap(),
        ))
    }

    fn repository() -> Arc<dyn UserRepository> {
        let source = build_data_source(DataSourceType::SqliteMemory, Duration::from_secs(1))
            .unwrap();
        Arc::new(UserRepositoryImpl::new(source))
    }

    fn person(first: &str, last: &str, email: &str) -> User {
        User {
            id: 0,
            first_name: first.into(),
            last_name: last.into(),
            email: email.into(),
            phone: "1234567890".into(),
            dob: "1990-01-01".into(),
            address: "".into(),
        }
    }

    async fn wait_for_users<F>(rx: &mut watch::Receiver<UserListState>, pred: F) -> Vec<User>
    where
        F: Fn(&[User]) -> bool,
    {
        let state = tokio::time::timeout(
            Duration::from_secs(5),
            rx.wait_for(|s| matches!(s, Outcome::Success(users) if pred(users.as_slice()))),
        )
        .await
        .expect("timed out waiting for users")
        .expect("state channel closed");
        state.success().cloned().unwrap()
    }

    async fn wait_for_filtered<F>(rx: &mut watch::Receiver<Vec<User>>, pred: F) -> Vec<User>
    where
        F: Fn(&[User]) -> bool,
    {
        let waiting = rx.wait_for(|u| pred(u.as_slice()));
        let users = tokio::time::timeout(Duration::from_secs(5), waiting)
            .await
            .expect("timed out waiting for filtered users")
            .expect("filtered channel closed");
        users.clone()
    }

    #[tokio::test]
    async fn test_start_loads_then_lists() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("Jane", "Roe", "jane@example.com")).unwrap();

        // act
        let coordinator = UserListCoordinator::start(repo, validator(), &settings());

        // assert
        assert!(coordinator.current_state().is_loading());
        let mut rx = coordinator.state();
        let users = wait_for_users(&mut rx, |u| !u.is_empty()).await;
        assert_eq!(users.len(), 2);
        assert_eq!(users[0].first_name, "John");
    }

    #[tokio::test]
    async fn test_add_user_refreshes_list() {
        // arrange
        let repo = repository();
        let coordinator = UserListCoordinator::start(repo.clone(), validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.is_empty()).await;

        // act
        let outcome = coordinator
            .add_user(person("John", "Doe", "john@example.com"))
            .await;

        // assert
        let added = outcome.success().cloned().unwrap();
        assert!(added.id > 0);
        let users = wait_for_users(&mut rx, |u| u.len() == 1).await;
        assert_eq!(users[0], added);
        assert_eq!(repo.get_user(added.id).unwrap(), added);
    }

    #[tokio::test]
    async fn test_add_user_invalid_persists_nothing() {
        // arrange
        let repo = repository();
        let coordinator = UserListCoordinator::start(repo.clone(), validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.is_empty()).await;

        // act
        let outcome = coordinator
            .add_user(person(" ", "Doe", "not-an-email"))
            .await;

        // assert
        assert_eq!(
            outcome,
            Outcome::Error("First name cannot be empty".into())
        );
        assert_eq!(
            coordinator.current_state(),
            Outcome::Error("First name cannot be empty".into())
        );
        assert_eq!(repo.count_users().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_add_user_already_exists() {
        // arrange
        let repo = repository();
        let coordinator = UserListCoordinator::start(repo.clone(), validator(), &settings());
        let mut rx = coordinator.state();
        let first = coordinator
            .add_user(person("John", "Doe", "john@example.com"))
            .await;
        assert!(first.success().is_some());
        wait_for_users(&mut rx, |u| u.len() == 1).await;

        // act
        let outcome = coordinator
            .add_user(person("Jane", "Doe", "john@example.com"))
            .await;

        // assert
        assert_eq!(
            outcome.error_message(),
            Some("a user with email john@example.com already exists")
        );
        assert!(coordinator.current_state().error_message().is_some());
        assert_eq!(repo.count_users().unwrap(), 1);
        assert_eq!(
            repo.get_user_by_email("john@example.com")
                .unwrap()
                .unwrap()
                .first_name,
            "John"
        );
    }

    #[tokio::test]
    async fn test_update_user() {
        // arrange
        let repo = repository();
        let coordinator = UserListCoordinator::start(repo.clone(), validator(), &settings());
        let mut rx = coordinator.state();
        let john = coordinator
            .add_user(person("John", "Doe", "john@example.com"))
            .await
            .success()
            .cloned()
            .unwrap();
        let jane = coordinator
            .add_user(person("Jane", "Roe", "jane@example.com"))
            .await
            .success()
            .cloned()
            .unwrap();
        wait_for_users(&mut rx, |u| u.len() == 2).await;

        // act
        let mut changed = john.clone();
        changed.address = "42 Elm St".into();
        let outcome = coordinator.update_user(changed.clone()).await;

        // assert
        assert_eq!(outcome, Outcome::Success(changed.clone()));
        let users = wait_for_users(&mut rx, |u| u.iter().any(|x| x.address == "42 Elm St")).await;
        assert_eq!(users, vec![changed, jane]);
    }

    #[tokio::test]
    async fn test_update_user_not_found() {
        // arrange
        let repo = repository();
        let coordinator = UserListCoordinator::start(repo, validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.is_empty()).await;
        let mut ghost = person("John", "Doe", "john@example.com");
        ghost.id = 99;

        // act
        let outcome = coordinator.update_user(ghost).await;

        // assert
        assert_eq!(outcome, Outcome::Error("no such user: 99".into()));
        assert_eq!(
            coordinator.current_state(),
            Outcome::Error("no such user: 99".into())
        );
    }

    #[tokio::test]
    async fn test_delete_user() {
        // arrange
        let repo = repository();
        let john_id = repo
            .insert_user(person("John", "Doe", "john@example.com"))
            .unwrap();
        repo.insert_user(person("Jane", "Roe", "jane@example.com"))
            .unwrap();
        let coordinator = UserListCoordinator::start(repo.clone(), validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.len() == 2).await;

        // act
        let outcome = coordinator.delete_user(john_id).await;

        // assert
        assert_eq!(outcome, Outcome::Success(()));
        let users = wait_for_users(&mut rx, |u| u.len() == 1).await;
        assert_eq!(users[0].first_name, "Jane");
        assert!(repo.get_user(john_id).is_err());

        // deleting again reports the missing record
        let outcome = coordinator.delete_user(john_id).await;
        assert_eq!(
            outcome.error_message().map(str::to_owned),
            Some(format!("no such user: {}", john_id))
        );
    }

    #[tokio::test]
    async fn test_search_uses_latest_query() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("Jane", "Roe", "jane@example.com")).unwrap();
        repo.insert_user(person("Bob", "Smith", "bob@example.com")).unwrap();
        let coordinator = UserListCoordinator::start(repo, validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.len() == 3).await;

        // act
        coordinator.set_search_query("bob");
        coordinator.set_search_query("JO");

        // assert
        assert_eq!(coordinator.search_query(), "JO");
        let users = wait_for_users(&mut rx, |u| u.len() == 1).await;
        assert_eq!(users[0].first_name, "John");
        // the superseded query never takes effect
        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = coordinator.current_state();
        let users = state.success().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].first_name, "John");
    }

    #[tokio::test]
    async fn test_superseded_search_stays_silent() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("Bob", "Smith", "bob@example.com")).unwrap();
        let coordinator = UserListCoordinator::start(repo.clone(), validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.len() == 2).await;
        coordinator.set_search_query("bob");
        let users = wait_for_users(&mut rx, |u| u.len() == 1 && u[0].first_name == "Bob").await;
        assert_eq!(users[0].last_name, "Smith");
        coordinator.set_search_query("jo");
        wait_for_users(&mut rx, |u| u.len() == 1 && u[0].first_name == "John").await;
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut watcher = coordinator.state();
        let collector = tokio::spawn(async move {
            while watcher.changed().await.is_ok() {
                let state = watcher.borrow_and_update().clone();
                sink.lock().unwrap().push(state);
            }
        });

        // act: a change the "bob" search would have picked up
        repo.insert_user(person("Bobby", "Tables", "bobby@example.com"))
            .unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;
        collector.abort();

        // assert
        let seen = seen.lock().unwrap();
        assert!(!seen.is_empty());
        for state in seen.iter() {
            if let Some(users) = state.success() {
                assert!(users.iter().all(|u| u.first_name == "John"));
            }
        }
        let state = coordinator.current_state();
        let users = state.success().unwrap();
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].first_name, "John");
    }

    #[tokio::test]
    async fn test_blank_query_shows_everyone() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("Jane", "Roe", "jane@example.com")).unwrap();
        let coordinator = UserListCoordinator::start(repo, validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.len() == 2).await;
        coordinator.set_search_query("roe");
        let users = wait_for_users(&mut rx, |u| u.len() == 1).await;
        assert_eq!(users[0].first_name, "Jane");

        // act
        coordinator.set_search_query("   ");

        // assert
        wait_for_users(&mut rx, |u| u.len() == 2).await;
    }

    #[tokio::test]
    async fn test_refresh_drops_search() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("Jane", "Roe", "jane@example.com")).unwrap();
        let coordinator = UserListCoordinator::start(repo, validator(), &settings());
        let mut rx = coordinator.state();
        coordinator.set_search_query("doe");
        wait_for_users(&mut rx, |u| u.len() == 1).await;
        assert_eq!(coordinator.search_query(), "doe");

        // act
        coordinator.refresh();

        // assert
        let users = wait_for_users(&mut rx, |u| u.len() == 2).await;
        assert_eq!(users[1].first_name, "Jane");
        assert_eq!(coordinator.search_query(), "");
    }

    #[tokio::test]
    async fn test_refresh_cancels_pending_search() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("Jane", "Roe", "jane@example.com")).unwrap();
        let coordinator = UserListCoordinator::start(repo, validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.len() == 2).await;

        // act
        coordinator.set_search_query("roe");
        coordinator.refresh();

        // assert
        tokio::time::sleep(Duration::from_millis(200)).await;
        let state = coordinator.current_state();
        assert_eq!(state.success().map(Vec::len), Some(2));
        assert_eq!(coordinator.search_query(), "");
    }

    #[tokio::test]
    async fn test_first_name_filter() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("johanna", "Roe", "jo@example.com")).unwrap();
        repo.insert_user(person("Bob", "Smith", "bob@example.com")).unwrap();
        let coordinator = UserListCoordinator::start(repo.clone(), validator(), &settings());
        let mut filtered = coordinator.filtered_users();
        wait_for_filtered(&mut filtered, |u| u.len() == 3).await;

        // act
        coordinator.set_first_name_filter(Some("JOH".into()));

        // assert: prefix match that ignores case
        let users = wait_for_filtered(&mut filtered, |u| u.len() == 2).await;
        assert_eq!(users[0].first_name, "John");
        assert_eq!(users[1].first_name, "johanna");
        assert_eq!(coordinator.filter(), UserFilter::by_first_name("JOH"));

        // a new source list is filtered too
        repo.insert_user(person("Johnny", "Bravo", "johnny@example.com"))
            .unwrap();
        let users = wait_for_filtered(&mut filtered, |u| u.len() == 3).await;
        assert!(users.iter().all(|u| u.first_name.to_lowercase().starts_with("joh")));

        coordinator.clear_filters();
        wait_for_filtered(&mut filtered, |u| u.len() == 4).await;
    }

    #[tokio::test]
    async fn test_filter_by_several_fields() {
        // arrange
        let repo = repository();
        repo.insert_user(person("John", "Doe", "john@example.com")).unwrap();
        repo.insert_user(person("John", "Smith", "smith@example.org")).unwrap();
        let coordinator = UserListCoordinator::start(repo, validator(), &settings());
        let mut filtered = coordinator.filtered_users();
        wait_for_filtered(&mut filtered, |u| u.len() == 2).await;

        // act
        coordinator.set_filter(UserFilter {
            first_name: Some("john".into()),
            email: Some(".org".into()),
            ..Default::default()
        });

        // assert
        let users = wait_for_filtered(&mut filtered, |u| u.len() == 1).await;
        assert_eq!(users[0].last_name, "Smith");
    }

    // the feed closes once the returned sender is dropped
    fn mock_with_feed() -> (MockUserRepository, watch::Sender<Arc<Vec<User>>>) {
        let (tx, rx) = watch::channel(Arc::new(Vec::<User>::new()));
        let mut records = MockUserRepository::new();
        records
            .expect_all_users()
            .returning(move || UserFeed::new(rx.clone()));
        (records, tx)
    }

    #[tokio::test]
    async fn test_store_failure_becomes_error_state() {
        // arrange
        let (mut records, _feed) = mock_with_feed();
        records
            .expect_delete_user()
            .returning(|_| Err(crate::Error::InternalError("disk on fire".into())));
        let coordinator = UserListCoordinator::start(Arc::new(records), validator(), &settings());
        let mut rx = coordinator.state();
        wait_for_users(&mut rx, |u| u.is_empty()).await;

        // act
        let outcome = coordinator.delete_user(1).await;

        // assert
        assert_eq!(
            outcome,
            Outcome::Error("something bad happened: disk on fire".into())
        );
        assert_eq!(
            coordinator.current_state(),
            Outcome::Error("something bad happened: disk on fire".into())
        );
    }

    // Real store with artificially slow email lookups or writes.
    struct SlowRepository {
        inner: Arc<dyn UserRepository>,
        lookup_delay: Duration,
        write_delay: Duration,
    }

    impl UserRepository for SlowRepository {
        fn all_users(&self) -> UserFeed {
            self.inner.all_users()
        }

        fn search_users(&self, query: &str) -> UserFeed {
            self.inner.search_users(query)
        }

        fn count_users(&self) -> Result<u32, crate::Error> {
            self.inner.count_users()
        }

        fn get_user(&self, user_id: i64) -> Result<User, crate::Error> {
            self.inner.get_user(user_id)
        }

        fn get_user_by_email(&self, email: &str) -> Result<Option<User>, crate::Error> {
            std::thread::sleep(self.lookup_delay);
            self.inner.get_user_by_email(email)
        }

        fn insert_user(&self, user: User) -> Result<i64, crate::Error> {
            std::thread::sleep(self.write_delay);
            self.inner.insert_user(user)
        }

        fn update_user(&self, user: User) -> Result<(), crate::Error> {
            std::thread::sleep(self.write_delay);
            self.inner.update_user(user)
        }

        fn delete_user(&self, user_id: i64) -> Result<(), crate::Error> {
            std::thread::sleep(self.write_delay);
            self.inner.delete_user(user_id)
        }
    }

    fn short_timeout() -> Settings {
        Settings {
            operation_timeout: Duration::from_millis(50),
            ..settings()
        }
    }

    #[tokio::test]
    async fn test_timed_out_add_leaves_store_unchanged() {
        // arrange
        let store = repository();
        let slow = SlowRepository {
            inner: Arc::clone(&store),
            lookup_delay: Duration::from_millis(300),
            write_delay: Duration::ZERO,
        };
        let coordinator = UserListCoordinator::start(Arc::new(slow), validator(), &short_timeout());

        // act
        let outcome = coordinator
            .add_user(person("John", "Doe", "john@example.com"))
            .await;
        let timed_out_at = std::time::Instant::now();
        // runs only after the abandoned job has let go of the operation lock
        let next = coordinator.delete_user(99).await;

        // assert
        assert_eq!(outcome, Outcome::Error("operation timed out".into()));
        assert!(timed_out_at.elapsed() >= Duration::from_millis(150));
        assert_eq!(next, Outcome::Error("no such user: 99".into()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.count_users().unwrap(), 0);
        assert!(store.get_user_by_email("john@example.com").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_slow_write_reports_actual_result() {
        // arrange
        let store = repository();
        let slow = SlowRepository {
            inner: Arc::clone(&store),
            lookup_delay: Duration::ZERO,
            write_delay: Duration::from_millis(300),
        };
        let coordinator = UserListCoordinator::start(Arc::new(slow), validator(), &short_timeout());

        // act
        let outcome = coordinator
            .add_user(person("John", "Doe", "john@example.com"))
            .await;

        // assert: the write had begun, so it was awaited past the timeout
        let added = outcome.success().cloned().unwrap();
        assert!(added.id > 0);
        assert_eq!(store.count_users().unwrap(), 1);
        assert_eq!(store.get_user(added.id).unwrap(), added);
    }
}
