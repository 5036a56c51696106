//! Demo dataset seeded into new sessions when enabled.

use chrono::Utc;
use tracing::debug;

use crate::data::SessionData;
use crate::error::Result;
use crate::records::{Article, Comment, User, hash_password};

/// Avatar used for demo users and newly registered users.
pub const DEFAULT_DEMO_IMAGE: &str = "https://upload.wikimedia.org/wikipedia/commons/thumb/8/8f/Cute-kittens-12929201-1600-1200.jpg/960px-Cute-kittens-12929201-1600-1200.jpg";

/// Password shared by every demo user.
pub const DEMO_PASSWORD: &str = "password123";

const USERS: [(&str, &str, &str); 4] = [
    (
        "john.doe@example.com",
        "johndoe",
        "Full-stack developer passionate about clean code and innovative solutions. Love working with modern web technologies.",
    ),
    (
        "jane.smith@example.com",
        "janesmith",
        "Frontend developer with a keen eye for UI/UX design. Specializing in React and modern CSS frameworks.",
    ),
    (
        "mike.wilson@example.com",
        "mikewilson",
        "Backend engineer focused on scalable architecture and DevOps. Enthusiast of cloud technologies and automation.",
    ),
    (
        "sarah.chen@example.com",
        "sarahchen",
        "Data scientist and machine learning engineer. Passionate about turning data into actionable insights.",
    ),
];

// (slug, title, description, body, tags); authored by USERS[i].
const ARTICLES: [(&str, &str, &str, &str, [&str; 4]); 4] = [
    (
        "how-to-learn-javascript-efficiently",
        "How to Learn JavaScript Efficiently",
        "A comprehensive guide to mastering JavaScript from beginner to advanced level",
        "Learning JavaScript can be overwhelming with so many resources available. Here's a structured approach that has helped thousands of developers master this essential language.\n\n## Start with the Fundamentals\n\nBefore diving into frameworks, master the core concepts: variables, functions, objects, and arrays.\n\n## Practice with Real Projects\n\nThe best way to learn is by building actual applications.\n\n## Join the Community\n\nEngage with other developers through forums, Discord servers, and local meetups.",
        ["javascript", "programming", "webdev", "beginners"],
    ),
    (
        "react-hooks-best-practices",
        "React Hooks: Best Practices and Common Pitfalls",
        "Essential patterns and anti-patterns when working with React Hooks",
        "React Hooks have revolutionized how we write React components, but they come with their own set of best practices and potential pitfalls.\n\n## useEffect Dependencies\n\nOne of the most common mistakes is forgetting to include dependencies in the useEffect array.\n\n## Custom Hooks for Reusability\n\nCreate custom hooks to encapsulate stateful logic that can be shared across components.\n\n## Performance Considerations\n\nUse useMemo and useCallback judiciously.",
        ["react", "hooks", "javascript", "frontend"],
    ),
    (
        "building-scalable-apis-with-node-js",
        "Building Scalable APIs with Node.js",
        "Architectural patterns and best practices for creating robust backend services",
        "Building scalable APIs requires careful consideration of architecture, error handling, and performance optimization.\n\n## API Design Principles\n\nFollow RESTful conventions and use appropriate HTTP status codes.\n\n## Error Handling Strategy\n\nImplement comprehensive error handling with proper logging and monitoring.\n\n## Database Optimization\n\nOptimize database queries and consider caching frequently accessed data.",
        ["nodejs", "api", "backend", "architecture"],
    ),
    (
        "introduction-to-machine-learning-for-developers",
        "Introduction to Machine Learning for Developers",
        "Getting started with ML concepts and practical applications for software developers",
        "Machine learning might seem intimidating, but it's more accessible than ever for developers looking to expand their skillset.\n\n## Understanding the Basics\n\nStart with supervised learning concepts like classification and regression.\n\n## Practical Tools and Libraries\n\nPython's scikit-learn is perfect for beginners.\n\n## Data Preprocessing\n\nMost of ML work involves cleaning and preparing data.",
        ["machinelearning", "python", "ai", "datascience"],
    ),
];

// (body, article index, author index)
const COMMENTS: [(&str, usize, usize); 8] = [
    (
        "Great article! I've been struggling with JavaScript concepts and this really helps clarify things.",
        0,
        1,
    ),
    (
        "The project-based approach really works. I built three projects following this guide and learned so much!",
        0,
        2,
    ),
    (
        "useEffect dependencies caught me so many times when I was learning React. Wish I had read this earlier!",
        1,
        0,
    ),
    (
        "Custom hooks are a game-changer. They make components so much cleaner and more reusable.",
        1,
        3,
    ),
    (
        "Error handling is definitely something I need to improve on. Thanks for the practical tips!",
        2,
        1,
    ),
    (
        "Connection pooling made such a difference in my API performance. Great advice!",
        2,
        0,
    ),
    (
        "As someone new to ML, this is exactly the kind of practical introduction I was looking for.",
        3,
        1,
    ),
    (
        "The data preprocessing section is spot on. It's definitely where most of the work happens in ML projects.",
        3,
        2,
    ),
];

// (follower, followed)
const FOLLOWS: [(usize, usize); 5] = [(0, 1), (0, 2), (1, 3), (2, 0), (2, 3)];

// (user, article)
const FAVORITES: [(usize, usize); 5] = [(0, 1), (0, 3), (1, 2), (2, 0), (3, 0)];

/// Seed `data` with four users and their articles, comments, follows and
/// favorites. Store capacities still apply, so small limits keep only the
/// newest records.
pub fn populate(data: &mut SessionData, image: &str) -> Result<()> {
    let now = Utc::now();
    let password = hash_password(DEMO_PASSWORD);

    let mut user_ids = Vec::with_capacity(USERS.len());
    for (email, username, bio) in USERS {
        let user = User::new(email, username, password.clone())
            .with_bio(bio)
            .with_image(image);
        user_ids.push(data.users.add(user)?);
    }

    let mut article_ids = Vec::with_capacity(ARTICLES.len());
    for (author, (slug, title, description, body, tags)) in ARTICLES.into_iter().enumerate() {
        let article = Article {
            id: String::new(),
            slug: slug.to_string(),
            title: title.to_string(),
            description: description.to_string(),
            body: body.to_string(),
            tag_list: tags.iter().map(|tag| tag.to_string()).collect(),
            author_id: user_ids[author].clone(),
            created_at: now,
            updated_at: now,
        };
        article_ids.push(data.articles.add(article)?);
    }

    for (body, article, author) in COMMENTS {
        let comment = Comment {
            id: String::new(),
            body: body.to_string(),
            article_id: article_ids[article].clone(),
            author_id: user_ids[author].clone(),
            created_at: now,
            updated_at: now,
        };
        data.comments.add(comment)?;
    }

    for (follower, followed) in FOLLOWS {
        data.follows.add(&user_ids[follower], &user_ids[followed])?;
    }
    for (user, article) in FAVORITES {
        data.favorites.add(&user_ids[user], &article_ids[article])?;
    }

    debug!(
        users = data.users.len(),
        articles = data.articles.len(),
        comments = data.comments.len(),
        "Demo data populated"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::StoreLimits;

    #[test]
    fn test_populate_default_limits() {
        let mut data = SessionData::new(&StoreLimits::default()).unwrap();
        populate(&mut data, DEFAULT_DEMO_IMAGE).unwrap();

        assert_eq!(data.users.len(), 4);
        assert_eq!(data.articles.len(), 4);
        assert_eq!(data.comments.len(), 8);
        assert_eq!(data.follows.len(), 5);
        assert_eq!(data.favorites.len(), 5);

        let john = data
            .find_user_by_credentials("john.doe@example.com", &hash_password(DEMO_PASSWORD))
            .unwrap();
        assert_eq!(john.username, "johndoe");
        assert_eq!(data.follows.targets_for_source(&john.id).unwrap(), vec!["2", "3"]);
    }

    #[test]
    fn test_populate_respects_capacity() {
        let limits = StoreLimits::new().with_max_comments(3).with_max_favorites(0);
        let mut data = SessionData::new(&limits).unwrap();
        populate(&mut data, DEFAULT_DEMO_IMAGE).unwrap();

        assert_eq!(data.comments.len(), 3);
        assert_eq!(data.comments.access_order(), ["6", "7", "8"]);
        assert!(data.favorites.is_empty());
    }
}
