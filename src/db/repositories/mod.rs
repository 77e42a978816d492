mod workouts;
